//! Domain events emitted by SchoolHub use cases.
//!
//! A use case finishes its primary write, then publishes a [`DomainEvent`]
//! on the event bus. Listeners in other modules (fees, notifications, user
//! provisioning, plugin audit) react to it independently.
//!
//! Each catalog event is a payload struct implementing [`EventKind`], which
//! pins its dot-namespaced event type and payload shape.

pub mod attendance;
pub mod fee;
pub mod library;
pub mod plugin;
pub mod student;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::{EventId, TenantId, UserId};

pub use attendance::{AttendanceMarked, AttendanceStatus};
pub use fee::{FeeAssigned, FeePaymentReceived};
pub use library::{LibraryBookIssued, LibraryBookOverdue};
pub use plugin::{
    PluginDisabled, PluginEnabled, PluginFailed, PluginInstalled, PluginUninstalled,
    PluginUpgraded,
};
pub use student::{StudentEnrolled, StudentWithdrawn};

/// A typed event payload with a fixed event type.
pub trait EventKind: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Dot-namespaced event type, e.g. `student.enrolled`.
    const EVENT_TYPE: &'static str;
}

/// Who and what an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Tenant the event happened in.
    pub tenant_id: TenantId,
    /// Acting user, when the action was user-initiated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Correlation id for tracing a request across modules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl EventMetadata {
    /// Metadata for a system-initiated event in the given tenant.
    pub fn new(tenant_id: impl Into<TenantId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: None,
            correlation_id: None,
        }
    }

    /// Attach the acting user.
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attach a correlation id.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// An immutable domain event.
///
/// Fields are private: once constructed an event is never mutated, and it
/// is shared with handlers behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    event_type: String,
    event_id: EventId,
    occurred_at: DateTime<Utc>,
    metadata: EventMetadata,
    payload: Value,
}

impl DomainEvent {
    /// Create an event with a raw payload.
    pub fn new(event_type: impl Into<String>, metadata: EventMetadata, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            event_id: EventId::new(),
            occurred_at: Utc::now(),
            metadata,
            payload,
        }
    }

    /// Create an event from a typed catalog payload.
    pub fn typed<E: EventKind>(metadata: EventMetadata, payload: &E) -> AppResult<Self> {
        let payload = serde_json::to_value(payload)?;
        Ok(Self::new(E::EVENT_TYPE, metadata, payload))
    }

    /// The dot-namespaced event type.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The globally unique event id.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// When the event was constructed.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Event metadata.
    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    /// Shortcut for the owning tenant.
    pub fn tenant_id(&self) -> &TenantId {
        &self.metadata.tenant_id
    }

    /// The raw payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Decode the payload into a typed catalog event.
    ///
    /// Fails when the event type does not match `E` or the payload does not
    /// have `E`'s shape.
    pub fn payload_as<E: EventKind>(&self) -> AppResult<E> {
        if self.event_type != E::EVENT_TYPE {
            return Err(AppError::validation(format!(
                "Event '{}' is not of type '{}'",
                self.event_type,
                E::EVENT_TYPE
            )));
        }
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}
