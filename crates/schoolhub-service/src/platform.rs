//! Composition root: builds repositories, the event bus, services and
//! listeners from configuration.

use std::sync::Arc;

use tracing::info;

use schoolhub_core::config::AppConfig;
use schoolhub_core::result::AppResult;
use schoolhub_database::Repositories;
use schoolhub_events::EventBus;

use crate::listeners::{self, Listeners};
use crate::plugin::{InstallationService, MarketplaceService};

/// The assembled application.
#[derive(Debug, Clone)]
pub struct Platform {
    /// Effective configuration.
    pub config: AppConfig,
    /// Storage for the configured provider.
    pub repositories: Repositories,
    /// Domain event bus with every listener registered.
    pub bus: EventBus,
    /// Catalog use cases.
    pub marketplace: MarketplaceService,
    /// Tenant installation use cases.
    pub installations: InstallationService,
    /// Listener-owned state.
    pub listeners: Listeners,
}

impl Platform {
    /// Connects the configured store and assembles the platform.
    pub async fn build(config: AppConfig) -> AppResult<Self> {
        let repositories = Repositories::connect(&config.database).await?;
        Self::assemble(config, repositories).await
    }

    /// Assembles the platform over existing repositories. Imports the
    /// catalog seed file when one is configured.
    pub async fn assemble(config: AppConfig, repositories: Repositories) -> AppResult<Self> {
        let bus = EventBus::new(&config.events);
        let listeners = Listeners::new(&config);
        listeners::register_all(&bus, &listeners);

        let marketplace = MarketplaceService::new(Arc::clone(&repositories.plugins));
        let installations = InstallationService::new(
            Arc::clone(&repositories.plugins),
            Arc::clone(&repositories.installations),
            bus.clone(),
        );

        if let Some(seed_file) = &config.catalog.seed_file {
            let summary = marketplace.import_file(seed_file).await?;
            info!(
                seed_file = %seed_file,
                imported = summary.imported,
                skipped = summary.skipped,
                "Catalog seeded"
            );
        }

        info!(
            provider = ?config.database.provider,
            event_types = bus.registry().event_types().len(),
            "Platform assembled"
        );

        Ok(Self {
            config,
            repositories,
            bus,
            marketplace,
            installations,
            listeners,
        })
    }

    /// Drains the event bus within the configured grace period and closes
    /// the store. Returns whether every in-flight handler finished.
    pub async fn shutdown(&self) -> bool {
        let drained = self.bus.shutdown(self.config.events.shutdown_grace()).await;
        self.repositories.close().await;
        drained
    }
}
