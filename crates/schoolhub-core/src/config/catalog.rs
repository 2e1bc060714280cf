//! Plugin catalog and notification outbox configuration.

use serde::{Deserialize, Serialize};

/// Plugin catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON file with catalog plugins imported at startup. A configured file
    /// that cannot be read fails startup.
    #[serde(default)]
    pub seed_file: Option<String>,
    /// Maximum plugin lifecycle audit entries kept in memory; oldest are
    /// dropped first.
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            seed_file: None,
            audit_capacity: default_audit_capacity(),
        }
    }
}

fn default_audit_capacity() -> usize {
    10_000
}

/// In-app notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Maximum notifications retained in the outbox; oldest are dropped first.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

fn default_outbox_capacity() -> usize {
    1000
}
