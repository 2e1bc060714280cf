//! Request context carrying the tenant and acting user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schoolhub_core::events::EventMetadata;
use schoolhub_core::types::{TenantId, UserId};

/// Context for the current request.
///
/// Supplied by the session layer and passed into service methods so every
/// operation knows *which* tenant it runs in and *who* is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Tenant the request runs in.
    pub tenant_id: TenantId,
    /// Acting user, absent for system jobs.
    pub user_id: Option<UserId>,
    /// Correlation id propagated into published events.
    pub correlation_id: Option<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a context for a system-initiated request.
    pub fn new(tenant_id: impl Into<TenantId>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: None,
            correlation_id: None,
            request_time: Utc::now(),
        }
    }

    /// Sets the acting user.
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the correlation id.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Metadata for events published on behalf of this request.
    pub fn event_metadata(&self) -> EventMetadata {
        EventMetadata {
            tenant_id: self.tenant_id.clone(),
            user_id: self.user_id,
            correlation_id: self.correlation_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_metadata_carries_request_identity() {
        let user = UserId::new();
        let ctx = RequestContext::new("greenfield")
            .with_user(user)
            .with_correlation_id("req-9");
        let metadata = ctx.event_metadata();
        assert_eq!(metadata.tenant_id.as_str(), "greenfield");
        assert_eq!(metadata.user_id, Some(user));
        assert_eq!(metadata.correlation_id.as_deref(), Some("req-9"));
    }
}
