//! Notifications: turns domain events into in-app notifications.
//!
//! Notifications land in a bounded outbox. When it is full the oldest
//! entry is dropped; delivery to email, SMS or push happens elsewhere.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use schoolhub_core::error::AppError;
use schoolhub_core::events::{
    AttendanceMarked, AttendanceStatus, DomainEvent, EventKind, FeeAssigned, FeePaymentReceived,
    LibraryBookOverdue, PluginFailed, StudentEnrolled,
};
use schoolhub_core::types::TenantId;
use schoolhub_events::EventBus;

const MODULE: &str = "notifications";

/// An in-app notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification ID.
    pub id: Uuid,
    /// Tenant it belongs to.
    pub tenant_id: TenantId,
    /// Event type that produced it.
    pub category: String,
    /// Short title.
    pub title: String,
    /// Message body.
    pub message: String,
    /// Explicit recipient, when the event names one.
    pub recipient: Option<String>,
    /// Source event correlation id.
    pub correlation_id: Option<String>,
    /// When it was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn from_event(event: &DomainEvent, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: event.tenant_id().clone(),
            category: event.event_type().to_string(),
            title: title.into(),
            message: message.into(),
            recipient: None,
            correlation_id: event.metadata().correlation_id.clone(),
            created_at: Utc::now(),
        }
    }

    fn to(mut self, recipient: Option<String>) -> Self {
        self.recipient = recipient;
        self
    }
}

/// Bounded, process-local notification outbox.
#[derive(Debug)]
pub struct NotificationOutbox {
    capacity: usize,
    entries: Mutex<VecDeque<Notification>>,
    dropped: AtomicU64,
}

impl NotificationOutbox {
    /// Creates an outbox holding at most `capacity` notifications.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Appends a notification, evicting the oldest when full.
    pub async fn push(&self, notification: Notification) {
        let mut entries = self.entries.lock().await;
        while entries.len() >= self.capacity {
            entries.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            tenant_id = %notification.tenant_id,
            category = %notification.category,
            "Notification queued"
        );
        entries.push_back(notification);
    }

    /// A tenant's notifications, oldest first.
    pub async fn for_tenant(&self, tenant_id: &TenantId) -> Vec<Notification> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|n| &n.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    /// Number of queued notifications.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the outbox is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Notifications evicted because the outbox was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Registers the notification listeners.
pub fn register(bus: &EventBus, outbox: Arc<NotificationOutbox>) {
    on_notify::<StudentEnrolled>(bus, &outbox, |event, p| {
        Some(
            Notification::from_event(
                event,
                "Enrollment confirmed",
                format!(
                    "{} ({}) is enrolled in grade {} for {}",
                    p.full_name, p.admission_number, p.grade, p.academic_year
                ),
            )
            .to(p.guardian_email),
        )
    });
    on_notify::<FeeAssigned>(bus, &outbox, |event, p| {
        Some(Notification::from_event(
            event,
            "Fee due",
            format!(
                "{} of {} is due on {}",
                p.fee_head,
                format_amount(p.amount_minor, &p.currency),
                p.due_date
            ),
        ))
    });
    on_notify::<FeePaymentReceived>(bus, &outbox, |event, p| {
        Some(Notification::from_event(
            event,
            "Payment received",
            format!(
                "Received {} (receipt {})",
                format_amount(p.amount_minor, &p.currency),
                p.receipt_number
            ),
        ))
    });
    on_notify::<AttendanceMarked>(bus, &outbox, |event, p| {
        (p.status == AttendanceStatus::Absent).then(|| {
            Notification::from_event(event, "Absence recorded", format!("Absent on {}", p.date))
        })
    });
    on_notify::<LibraryBookOverdue>(bus, &outbox, |event, p| {
        Some(Notification::from_event(
            event,
            "Library book overdue",
            format!("'{}' is {} day(s) overdue", p.title, p.days_overdue),
        ))
    });
    on_notify::<PluginFailed>(bus, &outbox, |event, p| {
        Some(Notification::from_event(
            event,
            "Plugin error",
            format!("Plugin '{}' failed: {}", p.plugin_id, p.error),
        ))
    });
}

fn on_notify<E>(
    bus: &EventBus,
    outbox: &Arc<NotificationOutbox>,
    render: fn(&DomainEvent, E) -> Option<Notification>,
) where
    E: EventKind,
{
    let outbox = Arc::clone(outbox);
    bus.on::<E, _, _>(MODULE, move |event, payload| {
        let outbox = Arc::clone(&outbox);
        async move { deliver(&outbox, render(&event, payload)).await }
    });
}

async fn deliver(outbox: &NotificationOutbox, notification: Option<Notification>) -> Result<(), AppError> {
    if let Some(notification) = notification {
        outbox.push(notification).await;
    }
    Ok(())
}

/// Formats minor units as a decimal amount, e.g. `150000, "INR"` →
/// `1500.00 INR`.
fn format_amount(amount_minor: i64, currency: &str) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{sign}{}.{:02} {currency}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use schoolhub_core::events::EventMetadata;
    use schoolhub_core::types::StudentId;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(150_000, "INR"), "1500.00 INR");
        assert_eq!(format_amount(5, "USD"), "0.05 USD");
        assert_eq!(format_amount(-1_250, "USD"), "-12.50 USD");
    }

    #[tokio::test]
    async fn test_outbox_drops_oldest_at_capacity() {
        let outbox = NotificationOutbox::new(2);
        let event = DomainEvent::new("fee.assigned", EventMetadata::new("t1"), serde_json::json!({}));
        for title in ["first", "second", "third"] {
            outbox.push(Notification::from_event(&event, title, "")).await;
        }

        let titles: Vec<String> = outbox
            .for_tenant(&TenantId::from("t1"))
            .await
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["second", "third"]);
        assert_eq!(outbox.dropped(), 1);
    }

    #[tokio::test]
    async fn test_only_absences_notify() {
        let bus = EventBus::with_handler_timeout(None);
        let outbox = Arc::new(NotificationOutbox::new(10));
        register(&bus, Arc::clone(&outbox));

        let student_id = StudentId::new();
        let date = NaiveDate::from_ymd_opt(2024, 8, 12).unwrap();
        for status in [AttendanceStatus::Present, AttendanceStatus::Absent, AttendanceStatus::Late] {
            bus.publish_typed(
                EventMetadata::new("t1"),
                &AttendanceMarked {
                    student_id,
                    date,
                    status,
                },
            )
            .unwrap();
        }
        bus.wait_idle().await;

        let notifications = outbox.for_tenant(&TenantId::from("t1")).await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].category, "attendance.marked");
        assert_eq!(notifications[0].message, "Absent on 2024-08-12");
    }
}
