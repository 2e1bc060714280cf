//! Per-tenant plugin installation record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use schoolhub_core::types::{InstallationId, TenantId};

use super::model::Plugin;
use super::settings::{apply_patch, merge_settings};
use super::status::InstallStatus;

/// A catalog plugin installed by one tenant.
///
/// At most one record exists per (`tenant_id`, `plugin_id`); the store
/// enforces this with a unique index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledPlugin {
    /// Storage-assigned identity; `None` until first saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InstallationId>,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Catalog plugin business key.
    pub plugin_id: String,
    /// Installed version; may lag the catalog.
    pub version: String,
    /// Lifecycle status.
    pub status: InstallStatus,
    /// Tenant overrides merged over the plugin's default settings.
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Permissions granted to the plugin.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// When the plugin was installed.
    pub installed_at: DateTime<Utc>,
    /// Last time the plugin was enabled.
    #[serde(default)]
    pub enabled_at: Option<DateTime<Utc>>,
    /// Last time the plugin was disabled.
    #[serde(default)]
    pub disabled_at: Option<DateTime<Utc>>,
    /// Most recent runtime failure.
    #[serde(default)]
    pub last_error: Option<String>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl InstalledPlugin {
    /// Create an unsaved installation of the plugin's current version.
    ///
    /// The manifest's permissions are granted and no settings are
    /// overridden.
    pub fn new(tenant_id: TenantId, plugin: &Plugin) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            tenant_id,
            plugin_id: plugin.plugin_id.clone(),
            version: plugin.version.clone(),
            status: InstallStatus::Installed,
            settings: Map::new(),
            permissions: plugin.manifest.permissions.clone(),
            installed_at: now,
            enabled_at: None,
            disabled_at: None,
            last_error: None,
            updated_at: now,
        }
    }

    /// Whether the plugin is active for the tenant.
    pub fn is_enabled(&self) -> bool {
        self.status == InstallStatus::Enabled
    }

    /// Turn the plugin on. Clears any recorded error. Returns `false` if
    /// it was already enabled.
    pub fn enable(&mut self) -> bool {
        if self.is_enabled() {
            return false;
        }
        let now = Utc::now();
        self.status = InstallStatus::Enabled;
        self.enabled_at = Some(now);
        self.last_error = None;
        self.updated_at = now;
        true
    }

    /// Turn the plugin off. Returns `false` if it was already disabled.
    pub fn disable(&mut self) -> bool {
        if self.status == InstallStatus::Disabled {
            return false;
        }
        let now = Utc::now();
        self.status = InstallStatus::Disabled;
        self.disabled_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Record a runtime failure.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = InstallStatus::Error;
        self.last_error = Some(message.into());
        self.updated_at = Utc::now();
    }

    /// Apply a settings patch; `null` values drop the override.
    pub fn patch_settings(&mut self, patch: Map<String, Value>) {
        apply_patch(&mut self.settings, patch);
        self.updated_at = Utc::now();
    }

    /// Move to a new version. Returns the previous version, or `None` if
    /// already current.
    pub fn upgrade_to(&mut self, version: &str) -> Option<String> {
        if self.version == version {
            return None;
        }
        let previous = std::mem::replace(&mut self.version, version.to_string());
        self.updated_at = Utc::now();
        Some(previous)
    }

    /// Settings as the plugin sees them: overrides merged over `defaults`.
    /// Computed on every read, never stored.
    pub fn effective_settings(&self, defaults: &Map<String, Value>) -> Map<String, Value> {
        merge_settings(defaults, &self.settings)
    }

    /// Whether the catalog has a different version than the installed one.
    pub fn has_update(&self, catalog_version: &str) -> bool {
        self.version != catalog_version
    }
}
