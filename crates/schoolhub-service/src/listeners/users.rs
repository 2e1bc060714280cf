//! Users: provisions student portal accounts on enrollment and deactivates
//! them on withdrawal.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use schoolhub_core::error::AppError;
use schoolhub_core::events::{DomainEvent, StudentEnrolled, StudentWithdrawn};
use schoolhub_core::types::{StudentId, TenantId};
use schoolhub_events::EventBus;

const MODULE: &str = "users";

/// A student's portal login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalAccount {
    /// Login name, `<admission_number>@<tenant>`.
    pub username: String,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The student.
    pub student_id: StudentId,
    /// Display name.
    pub display_name: String,
    /// Whether the account can sign in.
    pub active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was deactivated.
    pub deactivated_at: Option<DateTime<Utc>>,
}

/// Portal accounts keyed by tenant and student.
#[derive(Debug, Default)]
pub struct PortalAccounts {
    accounts: DashMap<(TenantId, StudentId), PortalAccount>,
}

impl PortalAccounts {
    /// Creates an empty account store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the account for an enrolled student. Returns `false` if the
    /// student already has one.
    pub fn provision(&self, tenant_id: &TenantId, enrolled: &StudentEnrolled) -> bool {
        match self.accounts.entry((tenant_id.clone(), enrolled.student_id)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(PortalAccount {
                    username: format!("{}@{}", enrolled.admission_number, tenant_id),
                    tenant_id: tenant_id.clone(),
                    student_id: enrolled.student_id,
                    display_name: enrolled.full_name.clone(),
                    active: true,
                    created_at: Utc::now(),
                    deactivated_at: None,
                });
                true
            }
        }
    }

    /// Deactivates a student's account. Returns `false` if there is no
    /// active account.
    pub fn deactivate(&self, tenant_id: &TenantId, student_id: StudentId) -> bool {
        match self.accounts.get_mut(&(tenant_id.clone(), student_id)) {
            Some(mut account) if account.active => {
                account.active = false;
                account.deactivated_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Looks up a student's account.
    pub fn get(&self, tenant_id: &TenantId, student_id: StudentId) -> Option<PortalAccount> {
        self.accounts
            .get(&(tenant_id.clone(), student_id))
            .map(|account| account.value().clone())
    }

    /// Number of accounts across all tenants.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Registers the user provisioning listeners.
pub fn register(bus: &EventBus, accounts: Arc<PortalAccounts>) {
    let on_enrolled = Arc::clone(&accounts);
    bus.on::<StudentEnrolled, _, _>(MODULE, move |event, enrolled| {
        let accounts = Arc::clone(&on_enrolled);
        async move { provision(&accounts, &event, &enrolled) }
    });

    bus.on::<StudentWithdrawn, _, _>(MODULE, move |event, withdrawn| {
        let accounts = Arc::clone(&accounts);
        async move { deactivate(&accounts, &event, &withdrawn) }
    });
}

fn provision(
    accounts: &PortalAccounts,
    event: &DomainEvent,
    enrolled: &StudentEnrolled,
) -> Result<(), AppError> {
    if accounts.provision(event.tenant_id(), enrolled) {
        info!(
            tenant_id = %event.tenant_id(),
            student_id = %enrolled.student_id,
            "Portal account provisioned"
        );
    } else {
        debug!(
            tenant_id = %event.tenant_id(),
            student_id = %enrolled.student_id,
            "Portal account already exists"
        );
    }
    Ok(())
}

fn deactivate(
    accounts: &PortalAccounts,
    event: &DomainEvent,
    withdrawn: &StudentWithdrawn,
) -> Result<(), AppError> {
    if accounts.deactivate(event.tenant_id(), withdrawn.student_id) {
        info!(
            tenant_id = %event.tenant_id(),
            student_id = %withdrawn.student_id,
            reason = withdrawn.reason.as_deref().unwrap_or(""),
            "Portal account deactivated"
        );
    } else {
        warn!(
            tenant_id = %event.tenant_id(),
            student_id = %withdrawn.student_id,
            "No active portal account for withdrawn student"
        );
    }
    Ok(())
}
