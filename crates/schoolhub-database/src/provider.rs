//! Document store provider selection.

use std::sync::Arc;

use tracing::info;

use schoolhub_core::config::{DatabaseConfig, DatabaseProvider};
use schoolhub_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::{MemoryInstalledPluginRepository, MemoryPluginRepository};
use crate::migration::run_migrations;
use crate::repositories::{
    InstalledPluginRepository, PgInstalledPluginRepository, PgPluginRepository,
    PluginCatalogRepository,
};

/// The repositories for the configured provider.
#[derive(Debug, Clone)]
pub struct Repositories {
    /// Global plugin catalog.
    pub plugins: Arc<dyn PluginCatalogRepository>,
    /// Per-tenant installations.
    pub installations: Arc<dyn InstalledPluginRepository>,
    pool: Option<DatabasePool>,
}

impl Repositories {
    /// Open the configured provider. For PostgreSQL this connects and,
    /// unless disabled, runs pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        match config.provider {
            DatabaseProvider::Memory => {
                info!("Using in-memory document store");
                Ok(Self::in_memory())
            }
            DatabaseProvider::Postgres => {
                let pool = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(pool.pool()).await?;
                }
                Ok(Self::postgres(pool))
            }
        }
    }

    /// Fresh, empty in-memory repositories.
    pub fn in_memory() -> Self {
        Self {
            plugins: Arc::new(MemoryPluginRepository::new()),
            installations: Arc::new(MemoryInstalledPluginRepository::new()),
            pool: None,
        }
    }

    /// PostgreSQL repositories sharing one pool.
    pub fn postgres(pool: DatabasePool) -> Self {
        Self {
            plugins: Arc::new(PgPluginRepository::new(pool.pool().clone())),
            installations: Arc::new(PgInstalledPluginRepository::new(pool.pool().clone())),
            pool: Some(pool),
        }
    }

    /// Whether the store is reachable. Always true in memory.
    pub async fn health_check(&self) -> AppResult<bool> {
        match &self.pool {
            Some(pool) => pool.health_check().await,
            None => Ok(true),
        }
    }

    /// Release pooled connections.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
