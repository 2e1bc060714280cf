//! Plugin installation lifecycle events.

use serde::{Deserialize, Serialize};

use super::EventKind;
use crate::types::InstallationId;

/// A tenant installed a catalog plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInstalled {
    /// The installation record ID.
    pub installation_id: InstallationId,
    /// Catalog plugin business key.
    pub plugin_id: String,
    /// Installed version.
    pub version: String,
}

impl EventKind for PluginInstalled {
    const EVENT_TYPE: &'static str = "plugin.installed";
}

/// A tenant enabled an installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEnabled {
    /// The installation record ID.
    pub installation_id: InstallationId,
    /// Catalog plugin business key.
    pub plugin_id: String,
}

impl EventKind for PluginEnabled {
    const EVENT_TYPE: &'static str = "plugin.enabled";
}

/// A tenant disabled an installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDisabled {
    /// The installation record ID.
    pub installation_id: InstallationId,
    /// Catalog plugin business key.
    pub plugin_id: String,
}

impl EventKind for PluginDisabled {
    const EVENT_TYPE: &'static str = "plugin.disabled";
}

/// An installation moved to a newer catalog version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginUpgraded {
    /// The installation record ID.
    pub installation_id: InstallationId,
    /// Catalog plugin business key.
    pub plugin_id: String,
    /// Previously installed version.
    pub from_version: String,
    /// Newly installed version.
    pub to_version: String,
}

impl EventKind for PluginUpgraded {
    const EVENT_TYPE: &'static str = "plugin.upgraded";
}

/// A runtime failure was recorded against an installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFailed {
    /// The installation record ID.
    pub installation_id: InstallationId,
    /// Catalog plugin business key.
    pub plugin_id: String,
    /// The recorded error.
    pub error: String,
}

impl EventKind for PluginFailed {
    const EVENT_TYPE: &'static str = "plugin.failed";
}

/// A tenant removed a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginUninstalled {
    /// The removed installation record ID.
    pub installation_id: InstallationId,
    /// Catalog plugin business key.
    pub plugin_id: String,
}

impl EventKind for PluginUninstalled {
    const EVENT_TYPE: &'static str = "plugin.uninstalled";
}
