//! Marketplace catalog: browsing, publishing and rating plugins.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use schoolhub_core::error::{AppError, ErrorKind};
use schoolhub_core::traits::DocumentRepository;
use schoolhub_core::types::PluginRecordId;
use schoolhub_database::PluginCatalogRepository;
use schoolhub_entity::plugin::Plugin;

/// Outcome of a bulk catalog import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// New plugins stored.
    pub imported: usize,
    /// Plugins whose `plugin_id` was already in the catalog.
    pub skipped: usize,
    /// Plugins that failed validation.
    pub rejected: usize,
}

/// Manages the global plugin catalog.
#[derive(Debug, Clone)]
pub struct MarketplaceService {
    /// Catalog repository.
    plugins: Arc<dyn PluginCatalogRepository>,
}

impl MarketplaceService {
    /// Creates a new marketplace service.
    pub fn new(plugins: Arc<dyn PluginCatalogRepository>) -> Self {
        Self { plugins }
    }

    /// Lists every catalog plugin in insertion order.
    pub async fn list(&self) -> Result<Vec<Plugin>, AppError> {
        self.plugins.find_all().await
    }

    /// Gets a plugin by record id.
    pub async fn get(&self, id: PluginRecordId) -> Result<Plugin, AppError> {
        self.plugins
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Plugin '{id}' not found")))
    }

    /// Gets a plugin by its business key.
    pub async fn get_by_plugin_id(&self, plugin_id: &str) -> Result<Plugin, AppError> {
        self.plugins
            .find_by_plugin_id(plugin_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Plugin '{plugin_id}' not found")))
    }

    /// Lists a category, most popular first.
    pub async fn by_category(&self, category: &str) -> Result<Vec<Plugin>, AppError> {
        self.plugins.find_by_category(category).await
    }

    /// Full-text search, most relevant first.
    pub async fn search(&self, query: &str) -> Result<Vec<Plugin>, AppError> {
        self.plugins.search(query).await
    }

    /// Publishes a new plugin to the catalog.
    pub async fn register(&self, plugin: Plugin) -> Result<Plugin, AppError> {
        if plugin.id.is_some() {
            return Err(AppError::validation(
                "A new catalog plugin must not carry a record id",
            ));
        }
        plugin.validate_catalog()?;

        let saved = self.plugins.save(plugin).await?;
        info!(
            plugin_id = %saved.plugin_id,
            version = %saved.version,
            category = %saved.category,
            "Plugin registered in catalog"
        );
        Ok(saved)
    }

    /// Releases a new version of a plugin.
    pub async fn release(
        &self,
        plugin_id: &str,
        version: &str,
        notes: &str,
    ) -> Result<Plugin, AppError> {
        let mut plugin = self.get_by_plugin_id(plugin_id).await?;
        let previous = plugin.version.clone();
        plugin.release(version, notes)?;
        let saved = self.plugins.save(plugin).await?;

        info!(plugin_id, from = %previous, to = %version, "Plugin version released");
        Ok(saved)
    }

    /// Records a tenant rating (0 to 5).
    pub async fn rate(&self, plugin_id: &str, score: f64) -> Result<Plugin, AppError> {
        let mut plugin = self.get_by_plugin_id(plugin_id).await?;
        plugin.record_rating(score)?;
        self.plugins.save(plugin).await
    }

    /// Marks a plugin as deprecated. Existing installations keep working.
    pub async fn deprecate(&self, plugin_id: &str) -> Result<Plugin, AppError> {
        let mut plugin = self.get_by_plugin_id(plugin_id).await?;
        plugin.deprecate()?;
        let saved = self.plugins.save(plugin).await?;
        info!(plugin_id, "Plugin deprecated");
        Ok(saved)
    }

    /// Withdraws a plugin from new installs.
    pub async fn withdraw(&self, plugin_id: &str) -> Result<Plugin, AppError> {
        let mut plugin = self.get_by_plugin_id(plugin_id).await?;
        plugin.withdraw();
        let saved = self.plugins.save(plugin).await?;
        info!(plugin_id, "Plugin withdrawn");
        Ok(saved)
    }

    /// Imports plugins, skipping those already in the catalog and rejecting
    /// invalid ones.
    pub async fn import(&self, plugins: Vec<Plugin>) -> Result<ImportSummary, AppError> {
        let mut summary = ImportSummary::default();

        for mut plugin in plugins {
            plugin.id = None;
            if self.plugins.find_by_plugin_id(&plugin.plugin_id).await?.is_some() {
                summary.skipped += 1;
                continue;
            }
            match self.register(plugin).await {
                Ok(_) => summary.imported += 1,
                Err(e) if e.kind == ErrorKind::Conflict => summary.skipped += 1,
                Err(e) if e.kind == ErrorKind::Validation => {
                    warn!(error = %e, "Rejected catalog entry during import");
                    summary.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            rejected = summary.rejected,
            "Catalog import finished"
        );
        Ok(summary)
    }

    /// Imports a JSON array of plugins from a file.
    pub async fn import_file(&self, path: impl AsRef<Path>) -> Result<ImportSummary, AppError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Failed to read catalog file '{}'", path.display()),
                e,
            )
        })?;
        let plugins: Vec<Plugin> = serde_json::from_str(&raw)?;
        self.import(plugins).await
    }
}
