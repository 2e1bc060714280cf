//! Event listeners, grouped by the module that consumes the events.
//!
//! Each module exposes a `register` function; [`register_all`] wires every
//! listener onto a bus at startup.

pub mod fees;
pub mod notifications;
pub mod plugins;
pub mod users;

use std::sync::Arc;

use schoolhub_core::config::AppConfig;
use schoolhub_events::EventBus;

pub use fees::{FeeItem, FeeScheduleBook};
pub use notifications::{Notification, NotificationOutbox};
pub use plugins::{PluginAuditEntry, PluginAuditLog};
pub use users::{PortalAccount, PortalAccounts};

/// State owned by the listeners.
#[derive(Debug, Clone)]
pub struct Listeners {
    /// Fee schedules per tenant and grade.
    pub fees: Arc<FeeScheduleBook>,
    /// In-app notification outbox.
    pub outbox: Arc<NotificationOutbox>,
    /// Student portal accounts.
    pub accounts: Arc<PortalAccounts>,
    /// Plugin lifecycle audit trail.
    pub audit: Arc<PluginAuditLog>,
}

impl Listeners {
    /// Creates empty listener state sized from `config`.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            fees: Arc::new(FeeScheduleBook::new()),
            outbox: Arc::new(NotificationOutbox::new(config.notifications.outbox_capacity)),
            accounts: Arc::new(PortalAccounts::new()),
            audit: Arc::new(PluginAuditLog::new(config.catalog.audit_capacity)),
        }
    }
}

/// Registers every listener on the bus.
pub fn register_all(bus: &EventBus, listeners: &Listeners) {
    fees::register(bus, Arc::clone(&listeners.fees));
    notifications::register(bus, Arc::clone(&listeners.outbox));
    users::register(bus, Arc::clone(&listeners.accounts));
    plugins::register(bus, Arc::clone(&listeners.audit));
}
