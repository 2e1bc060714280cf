//! In-memory catalog repository.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use schoolhub_core::result::AppResult;
use schoolhub_core::traits::DocumentRepository;
use schoolhub_core::types::PluginRecordId;
use schoolhub_entity::plugin::Plugin;

use super::collection::DocumentCollection;
use crate::repositories::{PluginCatalogRepository, decode_documents, sort_by_popularity};
use crate::search::{relevance, tokenize};

/// Catalog repository over a [`DocumentCollection`].
#[derive(Debug)]
pub struct MemoryPluginRepository {
    collection: DocumentCollection,
}

impl MemoryPluginRepository {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            collection: DocumentCollection::new("plugins")
                .with_unique_index("plugins_plugin_id_key", &["plugin_id"]),
        }
    }

    /// Store a raw document, bypassing entity serialization. Lets tests
    /// plant records that no longer match the entity shape.
    pub async fn insert_raw(&self, id: PluginRecordId, document: Value) -> AppResult<()> {
        self.collection.insert(id.into_uuid(), document).await
    }

    async fn decoded(&self, filter: &[(&str, Value)]) -> Vec<Plugin> {
        decode_documents(self.collection.name(), self.collection.scan(filter).await)
    }
}

impl Default for MemoryPluginRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentRepository<Plugin, PluginRecordId> for MemoryPluginRepository {
    async fn find_all(&self) -> AppResult<Vec<Plugin>> {
        Ok(self.decoded(&[]).await)
    }

    async fn find_by_id(&self, id: &PluginRecordId) -> AppResult<Option<Plugin>> {
        self.collection
            .get(id.into_uuid(), &[])
            .await
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    async fn save(&self, mut plugin: Plugin) -> AppResult<Plugin> {
        let now = Utc::now();
        match plugin.id {
            Some(id) => {
                plugin.updated_at = now;
                let document = serde_json::to_value(&plugin)?;
                let stored = self
                    .collection
                    .replace(id.into_uuid(), document, &[], &["id", "created_at"])
                    .await?;
                Ok(serde_json::from_value(stored)?)
            }
            None => {
                let id = PluginRecordId::new();
                plugin.id = Some(id);
                plugin.created_at = now;
                plugin.updated_at = now;
                let document = serde_json::to_value(&plugin)?;
                self.collection.insert(id.into_uuid(), document).await?;
                Ok(plugin)
            }
        }
    }

    async fn delete(&self, id: &PluginRecordId) -> AppResult<bool> {
        Ok(self.collection.remove(id.into_uuid(), &[]).await)
    }
}

#[async_trait]
impl PluginCatalogRepository for MemoryPluginRepository {
    async fn find_by_plugin_id(&self, plugin_id: &str) -> AppResult<Option<Plugin>> {
        let filter = [("plugin_id", Value::String(plugin_id.to_string()))];
        let documents = self.collection.scan(&filter).await;
        documents
            .into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    async fn find_by_category(&self, category: &str) -> AppResult<Vec<Plugin>> {
        let filter = [("category", Value::String(category.to_string()))];
        let mut plugins = self.decoded(&filter).await;
        sort_by_popularity(&mut plugins);
        Ok(plugins)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<Plugin>> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f64, Plugin)> = self
            .decoded(&[])
            .await
            .into_iter()
            .map(|plugin| (relevance(&plugin, &terms), plugin))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().map(|(_, plugin)| plugin).collect())
    }

    async fn increment_downloads(&self, plugin_id: &str) -> AppResult<bool> {
        let filter = [("plugin_id", Value::String(plugin_id.to_string()))];
        let updated_at = serde_json::to_value(Utc::now())?;
        let updated = self
            .collection
            .update_first(&filter, |fields| {
                let downloads = fields.get("downloads").and_then(Value::as_u64).unwrap_or(0);
                fields.insert("downloads".to_string(), Value::from(downloads + 1));
                fields.insert("updated_at".to_string(), updated_at);
            })
            .await?;
        Ok(updated.is_some())
    }
}
