//! PostgreSQL repository for per-tenant plugin installations.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;

use schoolhub_core::error::AppError;
use schoolhub_core::result::AppResult;
use schoolhub_core::traits::TenantScopedRepository;
use schoolhub_core::types::{InstallationId, TenantId};
use schoolhub_entity::plugin::InstalledPlugin;

use super::{InstalledPluginRepository, decode_documents};
use crate::error::map_db_error;

const COLLECTION: &str = "installed_plugins";

/// Repository for installations stored in the `installed_plugins` table.
///
/// Every query is filtered by `tenant_id`.
#[derive(Debug, Clone)]
pub struct PgInstalledPluginRepository {
    pool: PgPool,
}

impl PgInstalledPluginRepository {
    /// Create a new installation repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, mut record: InstalledPlugin) -> AppResult<InstalledPlugin> {
        let id = InstallationId::new();
        record.id = Some(id);
        record.updated_at = Utc::now();
        let document = serde_json::to_value(&record)?;

        sqlx::query(
            r#"INSERT INTO installed_plugins
                   (id, tenant_id, plugin_id, status, document, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(id)
        .bind(&record.tenant_id)
        .bind(&record.plugin_id)
        .bind(record.status.as_str())
        .bind(&document)
        .bind(record.installed_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to insert installed plugin", e))?;

        Ok(record)
    }

    async fn update(&self, id: InstallationId, mut record: InstalledPlugin) -> AppResult<InstalledPlugin> {
        let now = Utc::now();
        record.updated_at = now;
        let document = serde_json::to_value(&record)?;

        let stored: Option<Value> = sqlx::query_scalar(
            r#"UPDATE installed_plugins
               SET status = $3,
                   document = $4 || jsonb_build_object(
                       'id', id,
                       'tenant_id', tenant_id,
                       'plugin_id', plugin_id,
                       'installed_at', document->'installed_at'),
                   updated_at = $5
               WHERE id = $1 AND tenant_id = $2
               RETURNING document"#,
        )
        .bind(id)
        .bind(&record.tenant_id)
        .bind(record.status.as_str())
        .bind(&document)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to update installed plugin", e))?;

        let stored = stored.ok_or_else(|| {
            AppError::not_found(format!(
                "Installation '{id}' not found for tenant '{}'",
                record.tenant_id
            ))
        })?;
        Ok(serde_json::from_value(stored)?)
    }
}

#[async_trait]
impl TenantScopedRepository<InstalledPlugin, InstallationId> for PgInstalledPluginRepository {
    async fn find_all(&self, tenant_id: &TenantId) -> AppResult<Vec<InstalledPlugin>> {
        let documents: Vec<Value> = sqlx::query_scalar(
            "SELECT document FROM installed_plugins WHERE tenant_id = $1 ORDER BY seq",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to list installed plugins", e))?;

        Ok(decode_documents(COLLECTION, documents))
    }

    async fn find_by_id(
        &self,
        id: &InstallationId,
        tenant_id: &TenantId,
    ) -> AppResult<Option<InstalledPlugin>> {
        let document: Option<Value> = sqlx::query_scalar(
            "SELECT document FROM installed_plugins WHERE id = $1 AND tenant_id = $2",
        )
        .bind(*id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to find installed plugin by id", e))?;

        document
            .map(serde_json::from_value)
            .transpose()
            .map_err(AppError::from)
    }

    async fn save(&self, record: InstalledPlugin) -> AppResult<InstalledPlugin> {
        match record.id {
            Some(id) => self.update(id, record).await,
            None => self.insert(record).await,
        }
    }

    async fn delete(&self, id: &InstallationId, tenant_id: &TenantId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM installed_plugins WHERE id = $1 AND tenant_id = $2")
            .bind(*id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to delete installed plugin", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl InstalledPluginRepository for PgInstalledPluginRepository {
    async fn find_by_plugin_id(
        &self,
        plugin_id: &str,
        tenant_id: &TenantId,
    ) -> AppResult<Option<InstalledPlugin>> {
        let document: Option<Value> = sqlx::query_scalar(
            "SELECT document FROM installed_plugins WHERE plugin_id = $1 AND tenant_id = $2",
        )
        .bind(plugin_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to find installed plugin by plugin_id", e))?;

        document
            .map(serde_json::from_value)
            .transpose()
            .map_err(AppError::from)
    }

    async fn find_enabled_plugins(&self, tenant_id: &TenantId) -> AppResult<Vec<InstalledPlugin>> {
        let documents: Vec<Value> = sqlx::query_scalar(
            r#"SELECT document FROM installed_plugins
               WHERE tenant_id = $1 AND status = 'enabled'
               ORDER BY seq"#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to list enabled plugins", e))?;

        Ok(decode_documents(COLLECTION, documents))
    }
}
