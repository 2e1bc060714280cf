//! Fees: assigns the grade's fee schedule to newly enrolled students.

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use schoolhub_core::error::AppError;
use schoolhub_core::events::{DomainEvent, FeeAssigned, StudentEnrolled};
use schoolhub_core::types::TenantId;
use schoolhub_events::{EventBus, EventPublisher};

const MODULE: &str = "fees";

/// One fee head in a grade's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeItem {
    /// Fee head, e.g. `tuition`.
    pub fee_head: String,
    /// Amount in minor currency units.
    pub amount_minor: i64,
    /// ISO currency code.
    pub currency: String,
    /// Due date.
    pub due_date: NaiveDate,
}

/// Fee schedules keyed by tenant and grade.
#[derive(Debug, Default)]
pub struct FeeScheduleBook {
    schedules: DashMap<(TenantId, String), Vec<FeeItem>>,
}

impl FeeScheduleBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the schedule for a grade.
    pub fn set_schedule(&self, tenant_id: TenantId, grade: impl Into<String>, items: Vec<FeeItem>) {
        self.schedules.insert((tenant_id, grade.into()), items);
    }

    /// The schedule for a grade, empty if none is configured.
    pub fn schedule_for(&self, tenant_id: &TenantId, grade: &str) -> Vec<FeeItem> {
        self.schedules
            .get(&(tenant_id.clone(), grade.to_string()))
            .map(|items| items.value().clone())
            .unwrap_or_default()
    }
}

/// Registers the fee listeners.
pub fn register(bus: &EventBus, book: Arc<FeeScheduleBook>) {
    let publisher = bus.publisher();
    bus.on::<StudentEnrolled, _, _>(MODULE, move |event, enrolled| {
        let book = Arc::clone(&book);
        let publisher = publisher.clone();
        async move { assign_fees(&book, &publisher, &event, &enrolled) }
    });
}

fn assign_fees(
    book: &FeeScheduleBook,
    publisher: &EventPublisher,
    event: &DomainEvent,
    enrolled: &StudentEnrolled,
) -> Result<(), AppError> {
    let schedule = book.schedule_for(event.tenant_id(), &enrolled.grade);
    if schedule.is_empty() {
        debug!(
            tenant_id = %event.tenant_id(),
            grade = %enrolled.grade,
            "No fee schedule for grade"
        );
        return Ok(());
    }

    for item in &schedule {
        let assigned = FeeAssigned {
            student_id: enrolled.student_id,
            fee_head: item.fee_head.clone(),
            amount_minor: item.amount_minor,
            currency: item.currency.clone(),
            due_date: item.due_date,
        };
        publisher.publish_typed(event.metadata().clone(), &assigned)?;
    }

    info!(
        tenant_id = %event.tenant_id(),
        student_id = %enrolled.student_id,
        fee_heads = schedule.len(),
        "Fees assigned to enrolled student"
    );
    Ok(())
}
