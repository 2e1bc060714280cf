//! PostgreSQL catalog repository backed by a JSONB document column.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;

use schoolhub_core::error::AppError;
use schoolhub_core::result::AppResult;
use schoolhub_core::traits::DocumentRepository;
use schoolhub_core::types::PluginRecordId;
use schoolhub_entity::plugin::Plugin;

use super::{PluginCatalogRepository, decode_documents};
use crate::error::map_db_error;

const COLLECTION: &str = "plugins";

/// Repository for catalog plugins stored in the `plugins` table.
#[derive(Debug, Clone)]
pub struct PgPluginRepository {
    pool: PgPool,
}

impl PgPluginRepository {
    /// Create a new catalog repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, mut plugin: Plugin) -> AppResult<Plugin> {
        let id = PluginRecordId::new();
        let now = Utc::now();
        plugin.id = Some(id);
        plugin.created_at = now;
        plugin.updated_at = now;
        let document = serde_json::to_value(&plugin)?;

        sqlx::query(
            r#"INSERT INTO plugins (id, plugin_id, category, document, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $5)"#,
        )
        .bind(id)
        .bind(&plugin.plugin_id)
        .bind(&plugin.category)
        .bind(&document)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to insert plugin", e))?;

        Ok(plugin)
    }

    async fn update(&self, id: PluginRecordId, mut plugin: Plugin) -> AppResult<Plugin> {
        let now = Utc::now();
        plugin.updated_at = now;
        let document = serde_json::to_value(&plugin)?;

        let stored: Option<Value> = sqlx::query_scalar(
            r#"UPDATE plugins
               SET plugin_id = $2,
                   category = $3,
                   document = $4 || jsonb_build_object('id', id, 'created_at', document->'created_at'),
                   updated_at = $5
               WHERE id = $1
               RETURNING document"#,
        )
        .bind(id)
        .bind(&plugin.plugin_id)
        .bind(&plugin.category)
        .bind(&document)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to update plugin", e))?;

        let stored = stored.ok_or_else(|| AppError::not_found(format!("Plugin '{id}' not found")))?;
        Ok(serde_json::from_value(stored)?)
    }

    async fn fetch_documents(&self, sql: &str, bind: Option<&str>) -> AppResult<Vec<Value>> {
        let mut query = sqlx::query_scalar::<_, Value>(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to query plugins", e))
    }
}

#[async_trait]
impl DocumentRepository<Plugin, PluginRecordId> for PgPluginRepository {
    async fn find_all(&self) -> AppResult<Vec<Plugin>> {
        let documents = self
            .fetch_documents("SELECT document FROM plugins ORDER BY seq", None)
            .await?;
        Ok(decode_documents(COLLECTION, documents))
    }

    async fn find_by_id(&self, id: &PluginRecordId) -> AppResult<Option<Plugin>> {
        let document: Option<Value> =
            sqlx::query_scalar("SELECT document FROM plugins WHERE id = $1")
                .bind(*id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_db_error("Failed to find plugin by id", e))?;

        document
            .map(serde_json::from_value)
            .transpose()
            .map_err(AppError::from)
    }

    async fn save(&self, plugin: Plugin) -> AppResult<Plugin> {
        match plugin.id {
            Some(id) => self.update(id, plugin).await,
            None => self.insert(plugin).await,
        }
    }

    async fn delete(&self, id: &PluginRecordId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM plugins WHERE id = $1")
            .bind(*id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to delete plugin", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PluginCatalogRepository for PgPluginRepository {
    async fn find_by_plugin_id(&self, plugin_id: &str) -> AppResult<Option<Plugin>> {
        let document: Option<Value> =
            sqlx::query_scalar("SELECT document FROM plugins WHERE plugin_id = $1")
                .bind(plugin_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_db_error("Failed to find plugin by plugin_id", e))?;

        document
            .map(serde_json::from_value)
            .transpose()
            .map_err(AppError::from)
    }

    async fn find_by_category(&self, category: &str) -> AppResult<Vec<Plugin>> {
        let documents = self
            .fetch_documents(
                r#"SELECT document FROM plugins
                   WHERE category = $1
                   ORDER BY
                       CASE WHEN jsonb_typeof(document->'rating') = 'number'
                            THEN (document->>'rating')::float8 END DESC NULLS LAST,
                       CASE WHEN jsonb_typeof(document->'downloads') = 'number'
                            THEN (document->>'downloads')::numeric END DESC NULLS LAST,
                       seq"#,
                Some(category),
            )
            .await?;
        Ok(decode_documents(COLLECTION, documents))
    }

    async fn search(&self, query: &str) -> AppResult<Vec<Plugin>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let documents = self
            .fetch_documents(
                r#"SELECT document FROM plugins
                   WHERE search @@ plainto_tsquery('simple', $1)
                   ORDER BY ts_rank(search, plainto_tsquery('simple', $1)) DESC, seq"#,
                Some(query),
            )
            .await?;
        Ok(decode_documents(COLLECTION, documents))
    }
    async fn increment_downloads(&self, plugin_id: &str) -> AppResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"UPDATE plugins
               SET document = jsonb_set(
                       jsonb_set(
                           document,
                           '{downloads}',
                           to_jsonb(COALESCE(
                               CASE WHEN jsonb_typeof(document->'downloads') = 'number'
                                    THEN (document->>'downloads')::bigint END,
                               0) + 1)),
                       '{updated_at}',
                       $2),
                   updated_at = $3
               WHERE plugin_id = $1"#,
        )
        .bind(plugin_id)
        .bind(serde_json::to_value(now)?)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to record plugin download", e))?;
        Ok(result.rows_affected() > 0)
    }
}
