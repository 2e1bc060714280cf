//! Plugins: audit trail of plugin lifecycle events.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use schoolhub_core::error::AppError;
use schoolhub_core::events::{
    DomainEvent, EventKind, PluginDisabled, PluginEnabled, PluginFailed, PluginInstalled,
    PluginUninstalled, PluginUpgraded,
};
use schoolhub_core::types::{EventId, TenantId, UserId};
use schoolhub_events::{EventBus, handler_fn};

const MODULE: &str = "plugins";

const AUDITED_EVENTS: [&str; 6] = [
    PluginInstalled::EVENT_TYPE,
    PluginEnabled::EVENT_TYPE,
    PluginDisabled::EVENT_TYPE,
    PluginUpgraded::EVENT_TYPE,
    PluginFailed::EVENT_TYPE,
    PluginUninstalled::EVENT_TYPE,
];

/// One audited plugin lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginAuditEntry {
    /// Source event.
    pub event_id: EventId,
    /// Event type, e.g. `plugin.enabled`.
    pub action: String,
    /// Tenant.
    pub tenant_id: TenantId,
    /// Catalog plugin.
    pub plugin_id: String,
    /// Acting user.
    pub user_id: Option<UserId>,
    /// Correlation id of the originating request.
    pub correlation_id: Option<String>,
    /// When the change happened.
    pub occurred_at: DateTime<Utc>,
}

/// Bounded, append-only plugin audit trail. Once `capacity` entries are
/// held, each new entry evicts the oldest.
#[derive(Debug)]
pub struct PluginAuditLog {
    capacity: usize,
    entries: RwLock<VecDeque<PluginAuditEntry>>,
    dropped: AtomicU64,
}

impl PluginAuditLog {
    /// Creates an audit log holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(VecDeque::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Appends an entry, evicting the oldest when full.
    pub async fn record(&self, entry: PluginAuditEntry) {
        let mut entries = self.entries.write().await;
        while entries.len() >= self.capacity {
            entries.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        entries.push_back(entry);
    }

    /// Number of retained entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no entries are retained.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Entries evicted because the log was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// A tenant's entries, oldest first.
    pub async fn for_tenant(&self, tenant_id: &TenantId) -> Vec<PluginAuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| &e.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

/// Registers the audit listener for every plugin lifecycle event.
pub fn register(bus: &EventBus, audit: Arc<PluginAuditLog>) {
    for event_type in AUDITED_EVENTS {
        let audit = Arc::clone(&audit);
        bus.on_event(
            event_type,
            MODULE,
            handler_fn(move |event| {
                let audit = Arc::clone(&audit);
                async move { record(&audit, &event).await }
            }),
        );
    }
}

async fn record(audit: &PluginAuditLog, event: &DomainEvent) -> Result<(), AppError> {
    let plugin_id = event
        .payload()
        .get("plugin_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::handler_failure("Plugin event without plugin_id"))?;

    info!(
        action = %event.event_type(),
        tenant_id = %event.tenant_id(),
        plugin_id,
        event_id = %event.event_id(),
        "Plugin audit"
    );

    audit
        .record(PluginAuditEntry {
            event_id: event.event_id(),
            action: event.event_type().to_string(),
            tenant_id: event.tenant_id().clone(),
            plugin_id: plugin_id.to_string(),
            user_id: event.metadata().user_id,
            correlation_id: event.metadata().correlation_id.clone(),
            occurred_at: event.occurred_at(),
        })
        .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolhub_core::events::EventMetadata;
    use schoolhub_core::types::InstallationId;
    use serde_json::json;

    #[tokio::test]
    async fn test_lifecycle_events_are_audited() {
        let bus = EventBus::with_handler_timeout(None);
        let audit = Arc::new(PluginAuditLog::new(100));
        register(&bus, Arc::clone(&audit));

        let installation_id = InstallationId::new();
        let metadata = EventMetadata::new("t1").with_correlation_id("req-3");
        bus.publish_typed(
            metadata.clone(),
            &PluginInstalled {
                installation_id,
                plugin_id: "sms-gateway".to_string(),
                version: "2.0.0".to_string(),
            },
        )
        .unwrap();
        bus.wait_idle().await;
        bus.publish_typed(
            metadata,
            &PluginEnabled {
                installation_id,
                plugin_id: "sms-gateway".to_string(),
            },
        )
        .unwrap();
        bus.wait_idle().await;

        let entries = audit.for_tenant(&TenantId::from("t1")).await;
        let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["plugin.installed", "plugin.enabled"]);
        assert_eq!(entries[0].correlation_id.as_deref(), Some("req-3"));
    }

    #[tokio::test]
    async fn test_event_without_plugin_id_fails_handler() {
        let bus = EventBus::with_handler_timeout(None);
        let audit = Arc::new(PluginAuditLog::new(100));
        register(&bus, Arc::clone(&audit));

        bus.publish(PluginFailed::EVENT_TYPE, EventMetadata::new("t1"), json!({}));
        bus.wait_idle().await;

        assert_eq!(bus.stats().failed, 1);
        assert!(audit.for_tenant(&TenantId::from("t1")).await.is_empty());
    }

    #[tokio::test]
    async fn test_full_log_evicts_oldest_entries() {
        let bus = EventBus::with_handler_timeout(None);
        let audit = Arc::new(PluginAuditLog::new(3));
        register(&bus, Arc::clone(&audit));

        for n in 0..5 {
            bus.publish_typed(
                EventMetadata::new("t1"),
                &PluginEnabled {
                    installation_id: InstallationId::new(),
                    plugin_id: format!("plugin-{n}"),
                },
            )
            .unwrap();
            bus.wait_idle().await;
        }

        assert_eq!(audit.len().await, 3);
        assert_eq!(audit.dropped(), 2);
        let retained: Vec<String> = audit
            .for_tenant(&TenantId::from("t1"))
            .await
            .into_iter()
            .map(|e| e.plugin_id)
            .collect();
        assert_eq!(retained, vec!["plugin-2", "plugin-3", "plugin-4"]);
    }
}
