//! Catalog plugin entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use schoolhub_core::error::AppError;
use schoolhub_core::result::AppResult;
use schoolhub_core::types::PluginRecordId;

use super::manifest::PluginManifest;
use super::status::CatalogStatus;

/// Highest rating a tenant can give.
pub const MAX_RATING: f64 = 5.0;

/// One released version of a catalog plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    /// Version string.
    pub version: String,
    /// Release notes.
    #[serde(default)]
    pub notes: String,
    /// When the version was released.
    pub released_at: DateTime<Utc>,
}

/// A global marketplace plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Plugin {
    /// Storage-assigned identity; `None` until first saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PluginRecordId>,
    /// Stable business key referenced by installations.
    #[validate(custom(function = "validate_plugin_id"))]
    pub plugin_id: String,
    /// Display name.
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Latest published version.
    #[validate(length(min = 1, max = 32))]
    pub version: String,
    /// Marketplace description.
    #[serde(default)]
    pub description: String,
    /// Publisher.
    #[serde(default)]
    pub author: String,
    /// Marketplace category, e.g. `library` or `messaging`.
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    /// Published by the platform vendor.
    #[serde(default)]
    pub is_official: bool,
    /// Icon URL.
    #[serde(default)]
    pub icon: Option<String>,
    /// Banner URL.
    #[serde(default)]
    pub banner: Option<String>,
    /// Screenshot URLs.
    #[serde(default)]
    pub screenshots: Vec<String>,
    /// Price in the marketplace currency (0 = free).
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub price: f64,
    /// Number of installs ever made.
    #[serde(default)]
    pub downloads: u64,
    /// Running average of all ratings.
    #[serde(default)]
    pub rating: f64,
    /// Number of ratings in the average.
    #[serde(default)]
    pub rating_count: u64,
    /// Marketplace visibility.
    #[serde(default)]
    pub status: CatalogStatus,
    /// Provided capabilities.
    #[serde(default)]
    pub manifest: PluginManifest,
    /// Default settings; tenants override individual keys.
    #[serde(default)]
    pub settings: Map<String, Value>,
    /// Search tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Append-only release history.
    #[serde(default)]
    pub changelog: Vec<ChangelogEntry>,
    /// When the record was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Plugin {
    /// Create an unsaved catalog plugin with empty metadata.
    pub fn new(
        plugin_id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            plugin_id: plugin_id.into(),
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: String::new(),
            category: category.into(),
            is_official: false,
            icon: None,
            banner: None,
            screenshots: Vec::new(),
            price: 0.0,
            downloads: 0,
            rating: 0.0,
            rating_count: 0,
            status: CatalogStatus::Published,
            manifest: PluginManifest::default(),
            settings: Map::new(),
            tags: Vec::new(),
            changelog: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the search tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the manifest.
    pub fn with_manifest(mut self, manifest: PluginManifest) -> Self {
        self.manifest = manifest;
        self
    }

    /// Set the default settings.
    pub fn with_settings(mut self, settings: Map<String, Value>) -> Self {
        self.settings = settings;
        self
    }

    /// Validate catalog fields.
    pub fn validate_catalog(&self) -> AppResult<()> {
        self.validate()?;
        Ok(())
    }

    /// Fold one rating into the running average.
    pub fn record_rating(&mut self, score: f64) -> AppResult<()> {
        if !(0.0..=MAX_RATING).contains(&score) {
            return Err(AppError::validation(format!(
                "Rating must be between 0 and {MAX_RATING}, got {score}"
            )));
        }
        let total = self.rating * self.rating_count as f64 + score;
        self.rating_count += 1;
        self.rating = total / self.rating_count as f64;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Publish a new version and append it to the changelog.
    pub fn release(&mut self, version: impl Into<String>, notes: impl Into<String>) -> AppResult<()> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(AppError::validation("Version cannot be empty"));
        }
        if version == self.version || self.changelog.iter().any(|c| c.version == version) {
            return Err(AppError::conflict(format!(
                "Version '{version}' of plugin '{}' was already released",
                self.plugin_id
            )));
        }
        let now = Utc::now();
        self.changelog.push(ChangelogEntry {
            version: version.clone(),
            notes: notes.into(),
            released_at: now,
        });
        self.version = version;
        self.updated_at = now;
        Ok(())
    }

    /// Count one install.
    pub fn record_download(&mut self) {
        self.downloads += 1;
        self.updated_at = Utc::now();
    }

    /// Mark the plugin as superseded. Withdrawn plugins cannot be revived this way.
    pub fn deprecate(&mut self) -> AppResult<()> {
        if self.status == CatalogStatus::Withdrawn {
            return Err(AppError::validation(format!(
                "Plugin '{}' is withdrawn and cannot be deprecated",
                self.plugin_id
            )));
        }
        self.status = CatalogStatus::Deprecated;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Hide the plugin from new installs.
    pub fn withdraw(&mut self) {
        self.status = CatalogStatus::Withdrawn;
        self.updated_at = Utc::now();
    }
}

/// Plugin ids are lowercase slugs: `[a-z0-9-]`, 2 to 64 characters, no
/// leading or trailing dash.
fn validate_plugin_id(plugin_id: &str) -> Result<(), ValidationError> {
    let valid_chars = plugin_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_len = (2..=64).contains(&plugin_id.len());
    if valid_chars && valid_len && !plugin_id.starts_with('-') && !plugin_id.ends_with('-') {
        Ok(())
    } else {
        Err(ValidationError::new("plugin_id_slug"))
    }
}
