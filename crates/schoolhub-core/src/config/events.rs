//! Event bus configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Domain event bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Upper bound for a single handler invocation, in seconds (0 = unbounded).
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_seconds: u64,
    /// How long shutdown waits for in-flight handlers, in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl EventBusConfig {
    /// Handler timeout as a `Duration`, or `None` when unbounded.
    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_seconds > 0).then(|| Duration::from_secs(self.handler_timeout_seconds))
    }

    /// Shutdown grace period as a `Duration`.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            handler_timeout_seconds: default_handler_timeout(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_handler_timeout() -> u64 {
    30
}

fn default_shutdown_grace() -> u64 {
    10
}
