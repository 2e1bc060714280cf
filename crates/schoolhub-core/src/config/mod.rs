//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files and `SCHOOLHUB__`-prefixed environment variables.
//! Every section has serde defaults, so an empty configuration is valid.

pub mod catalog;
pub mod database;
pub mod events;
pub mod logging;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::catalog::{CatalogConfig, NotificationConfig};
pub use self::database::{DatabaseConfig, DatabaseProvider};
pub use self::events::EventBusConfig;
pub use self::logging::{LogFormat, LoggingConfig};

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Document store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Domain event bus settings.
    #[serde(default)]
    pub events: EventBusConfig,
    /// Plugin catalog settings.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// In-app notification settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default.toml`, `config/{env}.toml`, and environment
    /// variables prefixed with `SCHOOLHUB__`. Missing files are skipped.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config/default", env)
    }

    /// Load configuration using an explicit base file (without extension).
    /// The environment file is looked up next to it.
    pub fn load_from(base: &str, env: &str) -> Result<Self, AppError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&env_file(base, env)).required(false))
            .add_source(
                config::Environment::with_prefix("SCHOOLHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// `<dir of base>/<env>`, without extension.
fn env_file(base: &str, env: &str) -> String {
    match Path::new(base).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(env).to_string_lossy().into_owned(),
        _ => env.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.database.provider, DatabaseProvider::Memory);
        assert_eq!(config.events.handler_timeout_seconds, 30);
        assert_eq!(config.notifications.outbox_capacity, 1000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.catalog.seed_file.is_none());
        assert_eq!(config.catalog.audit_capacity, 10_000);
    }

    #[test]
    fn test_env_file_sits_next_to_base() {
        assert_eq!(env_file("config/default", "staging"), "config/staging");
        assert_eq!(env_file("/etc/schoolhub/base", "prod"), "/etc/schoolhub/prod");
        assert_eq!(env_file("default", "test"), "test");
    }

    #[test]
    fn test_load_from_reads_env_file_beside_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.toml"),
            "[logging]\nlevel = \"warn\"\n\n[notifications]\noutbox_capacity = 50\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.toml"),
            "[notifications]\noutbox_capacity = 75\n",
        )
        .unwrap();

        let base = dir.path().join("base");
        let config = AppConfig::load_from(base.to_str().unwrap(), "staging").unwrap();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.notifications.outbox_capacity, 75);
    }

    #[test]
    fn test_partial_section_override() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "database": { "provider": "postgres", "url": "postgres://localhost/schoolhub" },
            "events": { "handler_timeout_seconds": 0 }
        }))
        .unwrap();
        assert_eq!(config.database.provider, DatabaseProvider::Postgres);
        assert_eq!(config.database.max_connections, 20);
        assert!(config.events.handler_timeout().is_none());
    }
}
