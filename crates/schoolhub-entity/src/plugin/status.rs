//! Catalog and installation status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marketplace visibility of a catalog plugin.
///
/// Catalog plugins are never hard-deleted; they move through these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogStatus {
    /// Listed and installable.
    #[default]
    Published,
    /// Still installable but flagged as superseded.
    Deprecated,
    /// Hidden from new installs; existing installations keep working.
    Withdrawn,
}

impl CatalogStatus {
    /// Whether tenants may newly install a plugin in this state.
    pub fn is_installable(&self) -> bool {
        !matches!(self, Self::Withdrawn)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Deprecated => "deprecated",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for CatalogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a tenant's plugin installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallStatus {
    /// Installed but never enabled.
    Installed,
    /// Active for the tenant.
    Enabled,
    /// Switched off by the tenant.
    Disabled,
    /// A runtime failure was recorded.
    Error,
}

impl InstallStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InstallStatus {
    type Err = schoolhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "installed" => Ok(Self::Installed),
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            "error" => Ok(Self::Error),
            _ => Err(schoolhub_core::AppError::validation(format!(
                "Invalid install status: '{s}'. Expected one of: installed, enabled, disabled, error"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_status_from_str() {
        assert_eq!("enabled".parse::<InstallStatus>().unwrap(), InstallStatus::Enabled);
        assert_eq!("ERROR".parse::<InstallStatus>().unwrap(), InstallStatus::Error);
        assert!("uninstalled".parse::<InstallStatus>().is_err());
    }

    #[test]
    fn test_withdrawn_is_not_installable() {
        assert!(CatalogStatus::Published.is_installable());
        assert!(CatalogStatus::Deprecated.is_installable());
        assert!(!CatalogStatus::Withdrawn.is_installable());
    }
}
