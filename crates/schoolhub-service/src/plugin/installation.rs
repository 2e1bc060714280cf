//! Per-tenant plugin lifecycle: install, enable, disable, configure,
//! upgrade and uninstall.
//!
//! Every mutating operation writes the installation record first and only
//! then publishes its `plugin.*` event, so listeners always observe a
//! committed state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use schoolhub_core::error::AppError;
use schoolhub_core::events::{
    EventKind, PluginDisabled, PluginEnabled, PluginFailed, PluginInstalled, PluginUninstalled,
    PluginUpgraded,
};
use schoolhub_core::traits::{DocumentRepository, TenantScopedRepository};
use schoolhub_core::types::InstallationId;
use schoolhub_database::{InstalledPluginRepository, PluginCatalogRepository};
use schoolhub_entity::plugin::{InstalledPlugin, Plugin};
use schoolhub_events::EventBus;

use crate::context::RequestContext;

/// An installation lagging behind the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutdatedPlugin {
    /// The tenant's installation.
    pub installation: InstalledPlugin,
    /// Version currently published in the catalog.
    pub catalog_version: String,
}

/// Manages the plugins installed by each tenant.
#[derive(Debug, Clone)]
pub struct InstallationService {
    /// Catalog repository.
    catalog: Arc<dyn PluginCatalogRepository>,
    /// Installation repository.
    installations: Arc<dyn InstalledPluginRepository>,
    /// Domain event bus.
    bus: EventBus,
}

impl InstallationService {
    /// Creates a new installation service.
    pub fn new(
        catalog: Arc<dyn PluginCatalogRepository>,
        installations: Arc<dyn InstalledPluginRepository>,
        bus: EventBus,
    ) -> Self {
        Self {
            catalog,
            installations,
            bus,
        }
    }

    /// Installs the current catalog version of a plugin for the tenant.
    ///
    /// Fails with `NotFound` for unknown plugins, `Validation` for
    /// withdrawn ones and `Conflict` if the tenant already has it.
    pub async fn install(
        &self,
        ctx: &RequestContext,
        plugin_id: &str,
    ) -> Result<InstalledPlugin, AppError> {
        let plugin = self.catalog_plugin(plugin_id).await?;
        if !plugin.status.is_installable() {
            return Err(AppError::validation(format!(
                "Plugin '{plugin_id}' is {} and cannot be installed",
                plugin.status
            )));
        }

        let record = InstalledPlugin::new(ctx.tenant_id.clone(), &plugin);
        let saved = self.installations.save(record).await.map_err(|e| {
            if e.is_conflict() {
                AppError::conflict(format!(
                    "Plugin '{plugin_id}' is already installed for tenant '{}'",
                    ctx.tenant_id
                ))
            } else {
                e
            }
        })?;

        self.count_download(plugin_id).await;

        info!(
            tenant_id = %ctx.tenant_id,
            plugin_id,
            version = %saved.version,
            "Plugin installed"
        );
        self.emit(
            ctx,
            &PluginInstalled {
                installation_id: installation_id(&saved)?,
                plugin_id: saved.plugin_id.clone(),
                version: saved.version.clone(),
            },
        );
        Ok(saved)
    }

    /// Enables an installed plugin. No event is published when it was
    /// already enabled.
    pub async fn enable(
        &self,
        ctx: &RequestContext,
        plugin_id: &str,
    ) -> Result<InstalledPlugin, AppError> {
        let mut record = self.require(ctx, plugin_id).await?;
        if !record.enable() {
            return Ok(record);
        }
        let saved = self.installations.save(record).await?;

        info!(tenant_id = %ctx.tenant_id, plugin_id, "Plugin enabled");
        self.emit(
            ctx,
            &PluginEnabled {
                installation_id: installation_id(&saved)?,
                plugin_id: saved.plugin_id.clone(),
            },
        );
        Ok(saved)
    }

    /// Disables an installed plugin. The record is kept.
    pub async fn disable(
        &self,
        ctx: &RequestContext,
        plugin_id: &str,
    ) -> Result<InstalledPlugin, AppError> {
        let mut record = self.require(ctx, plugin_id).await?;
        if !record.disable() {
            return Ok(record);
        }
        let saved = self.installations.save(record).await?;

        info!(tenant_id = %ctx.tenant_id, plugin_id, "Plugin disabled");
        self.emit(
            ctx,
            &PluginDisabled {
                installation_id: installation_id(&saved)?,
                plugin_id: saved.plugin_id.clone(),
            },
        );
        Ok(saved)
    }

    /// Records a runtime failure and moves the plugin to `error`.
    pub async fn record_failure(
        &self,
        ctx: &RequestContext,
        plugin_id: &str,
        error: &str,
    ) -> Result<InstalledPlugin, AppError> {
        let mut record = self.require(ctx, plugin_id).await?;
        record.mark_error(error);
        let saved = self.installations.save(record).await?;

        warn!(tenant_id = %ctx.tenant_id, plugin_id, error, "Plugin failed");
        self.emit(
            ctx,
            &PluginFailed {
                installation_id: installation_id(&saved)?,
                plugin_id: saved.plugin_id.clone(),
                error: error.to_string(),
            },
        );
        Ok(saved)
    }

    /// Applies a settings patch. A `null` value removes that override.
    pub async fn update_settings(
        &self,
        ctx: &RequestContext,
        plugin_id: &str,
        patch: Map<String, Value>,
    ) -> Result<InstalledPlugin, AppError> {
        let mut record = self.require(ctx, plugin_id).await?;
        record.patch_settings(patch);
        let saved = self.installations.save(record).await?;
        info!(tenant_id = %ctx.tenant_id, plugin_id, "Plugin settings updated");
        Ok(saved)
    }

    /// Moves the installation to the catalog's current version. A no-op
    /// when already current.
    pub async fn upgrade(
        &self,
        ctx: &RequestContext,
        plugin_id: &str,
    ) -> Result<InstalledPlugin, AppError> {
        let mut record = self.require(ctx, plugin_id).await?;
        let plugin = self.catalog_plugin(plugin_id).await?;
        let Some(from_version) = record.upgrade_to(&plugin.version) else {
            return Ok(record);
        };
        let saved = self.installations.save(record).await?;

        info!(
            tenant_id = %ctx.tenant_id,
            plugin_id,
            from = %from_version,
            to = %saved.version,
            "Plugin upgraded"
        );
        self.emit(
            ctx,
            &PluginUpgraded {
                installation_id: installation_id(&saved)?,
                plugin_id: saved.plugin_id.clone(),
                from_version,
                to_version: saved.version.clone(),
            },
        );
        Ok(saved)
    }

    /// Removes the tenant's installation.
    pub async fn uninstall(&self, ctx: &RequestContext, plugin_id: &str) -> Result<(), AppError> {
        let record = self.require(ctx, plugin_id).await?;
        let id = installation_id(&record)?;
        if !self.installations.delete(&id, &ctx.tenant_id).await? {
            return Err(AppError::not_found(format!(
                "Plugin '{plugin_id}' is not installed for tenant '{}'",
                ctx.tenant_id
            )));
        }

        info!(tenant_id = %ctx.tenant_id, plugin_id, "Plugin uninstalled");
        self.emit(
            ctx,
            &PluginUninstalled {
                installation_id: id,
                plugin_id: record.plugin_id,
            },
        );
        Ok(())
    }

    /// All of the tenant's installations.
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<InstalledPlugin>, AppError> {
        self.installations.find_all(&ctx.tenant_id).await
    }

    /// The tenant's enabled installations.
    pub async fn enabled(&self, ctx: &RequestContext) -> Result<Vec<InstalledPlugin>, AppError> {
        self.installations.find_enabled_plugins(&ctx.tenant_id).await
    }

    /// Whether the tenant has the plugin installed and enabled.
    pub async fn is_enabled(&self, ctx: &RequestContext, plugin_id: &str) -> Result<bool, AppError> {
        Ok(self
            .installations
            .find_by_plugin_id(plugin_id, &ctx.tenant_id)
            .await?
            .is_some_and(|record| record.is_enabled()))
    }

    /// Settings as the plugin sees them: the tenant's overrides merged over
    /// the catalog defaults.
    pub async fn effective_settings(
        &self,
        ctx: &RequestContext,
        plugin_id: &str,
    ) -> Result<Map<String, Value>, AppError> {
        let record = self.require(ctx, plugin_id).await?;
        let defaults = match self.catalog.find_by_plugin_id(plugin_id).await? {
            Some(plugin) => plugin.settings,
            None => {
                warn!(plugin_id, "Installed plugin missing from catalog, using no defaults");
                Map::new()
            }
        };
        Ok(record.effective_settings(&defaults))
    }

    /// Installations whose version differs from the catalog's.
    pub async fn outdated(&self, ctx: &RequestContext) -> Result<Vec<OutdatedPlugin>, AppError> {
        let mut outdated = Vec::new();
        for installation in self.installations.find_all(&ctx.tenant_id).await? {
            let Some(plugin) = self.catalog.find_by_plugin_id(&installation.plugin_id).await? else {
                continue;
            };
            if installation.has_update(&plugin.version) {
                outdated.push(OutdatedPlugin {
                    installation,
                    catalog_version: plugin.version,
                });
            }
        }
        Ok(outdated)
    }

    async fn catalog_plugin(&self, plugin_id: &str) -> Result<Plugin, AppError> {
        self.catalog
            .find_by_plugin_id(plugin_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Plugin '{plugin_id}' not found in catalog")))
    }

    async fn require(
        &self,
        ctx: &RequestContext,
        plugin_id: &str,
    ) -> Result<InstalledPlugin, AppError> {
        self.installations
            .find_by_plugin_id(plugin_id, &ctx.tenant_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Plugin '{plugin_id}' is not installed for tenant '{}'",
                    ctx.tenant_id
                ))
            })
    }

    /// Download counts are best effort; a failure here never undoes the
    /// install.
    async fn count_download(&self, plugin_id: &str) {
        match self.catalog.increment_downloads(plugin_id).await {
            Ok(true) => {}
            Ok(false) => warn!(plugin_id, "Plugin left the catalog before its download was counted"),
            Err(e) => warn!(plugin_id, error = %e, "Failed to update download count"),
        }
    }

    fn emit<E: EventKind>(&self, ctx: &RequestContext, payload: &E) {
        if let Err(e) = self.bus.publish_typed(ctx.event_metadata(), payload) {
            warn!(event_type = E::EVENT_TYPE, error = %e, "Failed to publish event");
        }
    }
}

fn installation_id(record: &InstalledPlugin) -> Result<InstallationId, AppError> {
    record
        .id
        .ok_or_else(|| AppError::internal("Stored installation has no id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use schoolhub_core::error::ErrorKind;
    use schoolhub_core::result::AppResult;
    use schoolhub_core::types::PluginRecordId;
    use schoolhub_database::Repositories;
    use schoolhub_database::memory::MemoryPluginRepository;
    use schoolhub_entity::plugin::{CatalogStatus, InstallStatus};
    use serde_json::json;

    /// Catalog whose first lookup is followed by a concurrent edit from the
    /// catalog owner, landing before the installer writes anything back.
    #[derive(Debug)]
    struct EditedDuringLookup {
        inner: Arc<MemoryPluginRepository>,
        edited: AtomicBool,
    }

    #[async_trait]
    impl DocumentRepository<Plugin, PluginRecordId> for EditedDuringLookup {
        async fn find_all(&self) -> AppResult<Vec<Plugin>> {
            self.inner.find_all().await
        }

        async fn find_by_id(&self, id: &PluginRecordId) -> AppResult<Option<Plugin>> {
            self.inner.find_by_id(id).await
        }

        async fn save(&self, plugin: Plugin) -> AppResult<Plugin> {
            self.inner.save(plugin).await
        }

        async fn delete(&self, id: &PluginRecordId) -> AppResult<bool> {
            self.inner.delete(id).await
        }
    }

    #[async_trait]
    impl PluginCatalogRepository for EditedDuringLookup {
        async fn find_by_plugin_id(&self, plugin_id: &str) -> AppResult<Option<Plugin>> {
            let found = self.inner.find_by_plugin_id(plugin_id).await?;
            if let Some(mut edited) = found.clone() {
                if !self.edited.swap(true, Ordering::SeqCst) {
                    edited.release("2.1.0", "Unicode support")?;
                    edited.withdraw();
                    self.inner.save(edited).await?;
                }
            }
            Ok(found)
        }

        async fn find_by_category(&self, category: &str) -> AppResult<Vec<Plugin>> {
            self.inner.find_by_category(category).await
        }

        async fn search(&self, query: &str) -> AppResult<Vec<Plugin>> {
            self.inner.search(query).await
        }

        async fn increment_downloads(&self, plugin_id: &str) -> AppResult<bool> {
            self.inner.increment_downloads(plugin_id).await
        }
    }

    struct Fixture {
        service: InstallationService,
        repos: Repositories,
        bus: EventBus,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::in_memory();
        let bus = EventBus::with_handler_timeout(None);
        let sms = Plugin::new("sms-gateway", "SMS Gateway", "2.0.0", "messaging").with_settings(
            json!({ "sender_id": "SCHOOL", "unicode": false })
                .as_object()
                .cloned()
                .unwrap(),
        );
        repos.plugins.save(sms).await.unwrap();
        let service = InstallationService::new(
            Arc::clone(&repos.plugins),
            Arc::clone(&repos.installations),
            bus.clone(),
        );
        Fixture { service, repos, bus }
    }

    #[tokio::test]
    async fn test_install_enable_disable_cycle() {
        let fx = fixture().await;
        let ctx = RequestContext::new("t1");

        let installed = fx.service.install(&ctx, "sms-gateway").await.unwrap();
        assert_eq!(installed.status, InstallStatus::Installed);
        assert_eq!(installed.version, "2.0.0");
        assert!(fx.service.enabled(&ctx).await.unwrap().is_empty());

        fx.service.enable(&ctx, "sms-gateway").await.unwrap();
        assert!(fx.service.is_enabled(&ctx, "sms-gateway").await.unwrap());
        assert_eq!(fx.service.enabled(&ctx).await.unwrap().len(), 1);

        fx.service.disable(&ctx, "sms-gateway").await.unwrap();
        assert!(fx.service.enabled(&ctx).await.unwrap().is_empty());
        assert_eq!(fx.service.list(&ctx).await.unwrap().len(), 1);

        let catalog = fx.repos.plugins.find_by_plugin_id("sms-gateway").await.unwrap();
        assert_eq!(catalog.unwrap().downloads, 1);
    }

    #[tokio::test]
    async fn test_install_errors() {
        let fx = fixture().await;
        let ctx = RequestContext::new("t1");

        let err = fx.service.install(&ctx, "unknown").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        fx.service.install(&ctx, "sms-gateway").await.unwrap();
        let err = fx.service.install(&ctx, "sms-gateway").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let mut withdrawn = Plugin::new("old-sms", "Old SMS", "1.0.0", "messaging");
        withdrawn.withdraw();
        fx.repos.plugins.save(withdrawn).await.unwrap();
        let err = fx.service.install(&ctx, "old-sms").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_lifecycle_events_are_published() {
        let fx = fixture().await;
        let ctx = RequestContext::new("t1").with_correlation_id("req-1");

        fx.service.install(&ctx, "sms-gateway").await.unwrap();
        fx.service.enable(&ctx, "sms-gateway").await.unwrap();
        fx.service.enable(&ctx, "sms-gateway").await.unwrap();
        fx.service
            .record_failure(&ctx, "sms-gateway", "gateway timeout")
            .await
            .unwrap();
        fx.service.uninstall(&ctx, "sms-gateway").await.unwrap();

        // install, enable, failed, uninstalled; the repeated enable is a no-op
        assert_eq!(fx.bus.stats().published, 4);
    }

    #[tokio::test]
    async fn test_effective_settings_and_upgrade() {
        let fx = fixture().await;
        let ctx = RequestContext::new("t1");
        fx.service.install(&ctx, "sms-gateway").await.unwrap();

        let patch = json!({ "sender_id": "GRNFLD" }).as_object().cloned().unwrap();
        fx.service.update_settings(&ctx, "sms-gateway", patch).await.unwrap();
        let effective = fx.service.effective_settings(&ctx, "sms-gateway").await.unwrap();
        assert_eq!(
            Value::Object(effective),
            json!({ "sender_id": "GRNFLD", "unicode": false })
        );

        let clear = json!({ "sender_id": null }).as_object().cloned().unwrap();
        fx.service.update_settings(&ctx, "sms-gateway", clear).await.unwrap();
        let effective = fx.service.effective_settings(&ctx, "sms-gateway").await.unwrap();
        assert_eq!(effective["sender_id"], "SCHOOL");

        assert!(fx.service.outdated(&ctx).await.unwrap().is_empty());
        let mut plugin = fx.repos.plugins.find_by_plugin_id("sms-gateway").await.unwrap().unwrap();
        plugin.release("2.1.0", "Unicode support").unwrap();
        fx.repos.plugins.save(plugin).await.unwrap();

        let outdated = fx.service.outdated(&ctx).await.unwrap();
        assert_eq!(outdated.len(), 1);
        assert_eq!(outdated[0].catalog_version, "2.1.0");

        let upgraded = fx.service.upgrade(&ctx, "sms-gateway").await.unwrap();
        assert_eq!(upgraded.version, "2.1.0");
        assert!(fx.service.outdated(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_operations_are_tenant_scoped() {
        let fx = fixture().await;
        let t1 = RequestContext::new("t1");
        let t2 = RequestContext::new("t2");
        fx.service.install(&t1, "sms-gateway").await.unwrap();

        let err = fx.service.enable(&t2, "sms-gateway").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(!fx.service.is_enabled(&t2, "sms-gateway").await.unwrap());
        let err = fx.service.uninstall(&t2, "sms-gateway").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(fx.service.list(&t1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_download_count_keeps_concurrent_catalog_edits() {
        let inner = Arc::new(MemoryPluginRepository::new());
        inner
            .save(Plugin::new("sms-gateway", "SMS Gateway", "2.0.0", "messaging"))
            .await
            .unwrap();
        let catalog = Arc::new(EditedDuringLookup {
            inner: Arc::clone(&inner),
            edited: AtomicBool::new(false),
        });
        let repos = Repositories::in_memory();
        let service = InstallationService::new(
            catalog,
            Arc::clone(&repos.installations),
            EventBus::with_handler_timeout(None),
        );

        let installed = service
            .install(&RequestContext::new("t1"), "sms-gateway")
            .await
            .unwrap();
        assert_eq!(installed.version, "2.0.0");

        let stored = inner.find_by_plugin_id("sms-gateway").await.unwrap().unwrap();
        assert_eq!(stored.downloads, 1);
        assert_eq!(stored.status, CatalogStatus::Withdrawn);
        assert_eq!(stored.version, "2.1.0");
        assert_eq!(stored.changelog.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_installs_count_every_download() {
        let fx = fixture().await;

        let mut tasks = Vec::new();
        for n in 0..40 {
            let service = fx.service.clone();
            tasks.push(tokio::spawn(async move {
                let ctx = RequestContext::new(format!("tenant-{n}"));
                service.install(&ctx, "sms-gateway").await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let catalog = fx.repos.plugins.find_by_plugin_id("sms-gateway").await.unwrap();
        assert_eq!(catalog.unwrap().downloads, 40);
    }
}
