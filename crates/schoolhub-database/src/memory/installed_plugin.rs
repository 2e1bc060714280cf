//! In-memory installation repository.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use schoolhub_core::result::AppResult;
use schoolhub_core::traits::TenantScopedRepository;
use schoolhub_core::types::{InstallationId, TenantId};
use schoolhub_entity::plugin::{InstallStatus, InstalledPlugin};

use super::collection::DocumentCollection;
use crate::repositories::{InstalledPluginRepository, decode_documents};

/// Fields an update can never change.
const PINNED_FIELDS: &[&str] = &["id", "tenant_id", "plugin_id", "installed_at"];

/// Installation repository over a [`DocumentCollection`].
#[derive(Debug)]
pub struct MemoryInstalledPluginRepository {
    collection: DocumentCollection,
}

impl MemoryInstalledPluginRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            collection: DocumentCollection::new("installed_plugins").with_unique_index(
                "installed_plugins_tenant_plugin_key",
                &["tenant_id", "plugin_id"],
            ),
        }
    }
}

impl Default for MemoryInstalledPluginRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn tenant_filter(tenant_id: &TenantId) -> (&'static str, Value) {
    ("tenant_id", Value::String(tenant_id.as_str().to_string()))
}

#[async_trait]
impl TenantScopedRepository<InstalledPlugin, InstallationId> for MemoryInstalledPluginRepository {
    async fn find_all(&self, tenant_id: &TenantId) -> AppResult<Vec<InstalledPlugin>> {
        let documents = self.collection.scan(&[tenant_filter(tenant_id)]).await;
        Ok(decode_documents(self.collection.name(), documents))
    }

    async fn find_by_id(
        &self,
        id: &InstallationId,
        tenant_id: &TenantId,
    ) -> AppResult<Option<InstalledPlugin>> {
        self.collection
            .get(id.into_uuid(), &[tenant_filter(tenant_id)])
            .await
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    async fn save(&self, mut record: InstalledPlugin) -> AppResult<InstalledPlugin> {
        record.updated_at = Utc::now();
        match record.id {
            Some(id) => {
                let filter = [tenant_filter(&record.tenant_id)];
                let document = serde_json::to_value(&record)?;
                let stored = self
                    .collection
                    .replace(id.into_uuid(), document, &filter, PINNED_FIELDS)
                    .await?;
                Ok(serde_json::from_value(stored)?)
            }
            None => {
                let id = InstallationId::new();
                record.id = Some(id);
                let document = serde_json::to_value(&record)?;
                self.collection.insert(id.into_uuid(), document).await?;
                Ok(record)
            }
        }
    }

    async fn delete(&self, id: &InstallationId, tenant_id: &TenantId) -> AppResult<bool> {
        Ok(self
            .collection
            .remove(id.into_uuid(), &[tenant_filter(tenant_id)])
            .await)
    }
}

#[async_trait]
impl InstalledPluginRepository for MemoryInstalledPluginRepository {
    async fn find_by_plugin_id(
        &self,
        plugin_id: &str,
        tenant_id: &TenantId,
    ) -> AppResult<Option<InstalledPlugin>> {
        let filter = [
            tenant_filter(tenant_id),
            ("plugin_id", Value::String(plugin_id.to_string())),
        ];
        self.collection
            .scan(&filter)
            .await
            .into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    async fn find_enabled_plugins(&self, tenant_id: &TenantId) -> AppResult<Vec<InstalledPlugin>> {
        let filter = [
            tenant_filter(tenant_id),
            ("status", Value::String(InstallStatus::Enabled.as_str().to_string())),
        ];
        let documents = self.collection.scan(&filter).await;
        Ok(decode_documents(self.collection.name(), documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolhub_core::error::ErrorKind;
    use schoolhub_entity::plugin::Plugin;

    fn install(tenant: &str, plugin_id: &str) -> InstalledPlugin {
        let plugin = Plugin::new(plugin_id, plugin_id, "1.0.0", "misc");
        InstalledPlugin::new(TenantId::from(tenant), &plugin)
    }

    #[tokio::test]
    async fn test_one_installation_per_tenant_and_plugin() {
        let repo = MemoryInstalledPluginRepository::new();
        repo.save(install("t1", "sms-gateway")).await.unwrap();
        repo.save(install("t2", "sms-gateway")).await.unwrap();

        let err = repo.save(install("t1", "sms-gateway")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_reads_are_tenant_scoped() {
        let repo = MemoryInstalledPluginRepository::new();
        let saved = repo.save(install("t1", "sms-gateway")).await.unwrap();
        let id = saved.id.unwrap();
        let t1 = TenantId::from("t1");
        let t2 = TenantId::from("t2");

        assert!(repo.find_by_id(&id, &t1).await.unwrap().is_some());
        assert!(repo.find_by_id(&id, &t2).await.unwrap().is_none());
        assert!(repo.find_by_plugin_id("sms-gateway", &t2).await.unwrap().is_none());
        assert!(repo.find_all(&t2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_pins_identity_fields() {
        let repo = MemoryInstalledPluginRepository::new();
        let saved = repo.save(install("t1", "sms-gateway")).await.unwrap();

        let mut changed = saved.clone();
        changed.plugin_id = "renamed".to_string();
        changed.installed_at = chrono::DateTime::UNIX_EPOCH;
        changed.enable();
        let updated = repo.save(changed).await.unwrap();

        assert_eq!(updated.plugin_id, "sms-gateway");
        assert_eq!(updated.installed_at, saved.installed_at);
        assert_eq!(updated.status, InstallStatus::Enabled);
    }

    #[tokio::test]
    async fn test_cross_tenant_update_is_not_found() {
        let repo = MemoryInstalledPluginRepository::new();
        let saved = repo.save(install("t1", "sms-gateway")).await.unwrap();

        let mut hijack = saved.clone();
        hijack.tenant_id = TenantId::from("t2");
        hijack.enable();
        let err = repo.save(hijack).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let untouched = repo.find_by_id(&saved.id.unwrap(), &TenantId::from("t1")).await.unwrap();
        assert_eq!(untouched.unwrap().status, InstallStatus::Installed);
    }

    #[tokio::test]
    async fn test_enabled_filter_and_delete() {
        let repo = MemoryInstalledPluginRepository::new();
        let t1 = TenantId::from("t1");
        let mut sms = install("t1", "sms-gateway");
        sms.enable();
        let sms = repo.save(sms).await.unwrap();
        repo.save(install("t1", "barcode")).await.unwrap();
        let mut other = install("t2", "sms-gateway");
        other.enable();
        repo.save(other).await.unwrap();

        let enabled = repo.find_enabled_plugins(&t1).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].plugin_id, "sms-gateway");

        let id = sms.id.unwrap();
        assert!(!repo.delete(&id, &TenantId::from("t2")).await.unwrap());
        assert!(repo.delete(&id, &t1).await.unwrap());
        assert!(!repo.delete(&id, &t1).await.unwrap());
        assert!(repo.find_enabled_plugins(&t1).await.unwrap().is_empty());
    }
}
