//! Repository traits for the plugin catalog and tenant installations, with
//! their PostgreSQL implementations.

pub mod installed_plugin;
pub mod plugin;

use std::cmp::Ordering;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use schoolhub_core::result::AppResult;
use schoolhub_core::traits::{DocumentRepository, TenantScopedRepository};
use schoolhub_core::types::{InstallationId, PluginRecordId, TenantId};
use schoolhub_entity::plugin::{InstalledPlugin, Plugin};

pub use installed_plugin::PgInstalledPluginRepository;
pub use plugin::PgPluginRepository;

/// Global marketplace catalog storage.
///
/// `plugin_id` is unique across the catalog; saving a second record with
/// the same `plugin_id` fails with `Conflict`. Saving a record whose `id`
/// is set but unknown fails with `NotFound`.
#[async_trait]
pub trait PluginCatalogRepository: DocumentRepository<Plugin, PluginRecordId> + Debug {
    /// Find a catalog plugin by its business key.
    async fn find_by_plugin_id(&self, plugin_id: &str) -> AppResult<Option<Plugin>>;

    /// Plugins in `category`, highest rated first, then most downloaded,
    /// then in insertion order.
    async fn find_by_category(&self, category: &str) -> AppResult<Vec<Plugin>>;

    /// Full-text search over name, tags, category, description and author,
    /// most relevant first. An empty query matches nothing.
    async fn search(&self, query: &str) -> AppResult<Vec<Plugin>>;

    /// Add one to the plugin's download counter in a single atomic write,
    /// leaving every other field as stored. Returns `false` when no catalog
    /// record has this `plugin_id`.
    async fn increment_downloads(&self, plugin_id: &str) -> AppResult<bool>;
}

/// Per-tenant installation storage.
///
/// At most one record exists per (`tenant_id`, `plugin_id`). Updates never
/// change `id`, `tenant_id`, `plugin_id` or `installed_at`, and an update
/// addressed to another tenant's record fails with `NotFound`.
#[async_trait]
pub trait InstalledPluginRepository:
    TenantScopedRepository<InstalledPlugin, InstallationId> + Debug
{
    /// Find the tenant's installation of a catalog plugin.
    async fn find_by_plugin_id(
        &self,
        plugin_id: &str,
        tenant_id: &TenantId,
    ) -> AppResult<Option<InstalledPlugin>>;

    /// The tenant's installations whose status is `enabled`.
    async fn find_enabled_plugins(&self, tenant_id: &TenantId) -> AppResult<Vec<InstalledPlugin>>;
}

/// Stable ordering: rating descending, then downloads descending. Ties keep
/// their incoming order.
pub(crate) fn sort_by_popularity(plugins: &mut [Plugin]) {
    plugins.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.downloads.cmp(&a.downloads))
    });
}

/// Decode stored documents, skipping (and logging) any that no longer
/// match the entity shape.
pub(crate) fn decode_documents<T: DeserializeOwned>(
    collection: &str,
    documents: impl IntoIterator<Item = Value>,
) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get("id").cloned();
            match serde_json::from_value(document) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(collection, id = ?id, error = %e, "Skipping malformed document");
                    None
                }
            }
        })
        .collect()
}
