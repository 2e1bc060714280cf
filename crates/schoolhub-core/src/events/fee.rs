//! Fee events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::EventKind;
use crate::types::StudentId;

/// A fee was charged to a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAssigned {
    /// The student ID.
    pub student_id: StudentId,
    /// Fee head, e.g. `tuition` or `transport`.
    pub fee_head: String,
    /// Amount in minor currency units.
    pub amount_minor: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Payment due date.
    pub due_date: NaiveDate,
}

impl EventKind for FeeAssigned {
    const EVENT_TYPE: &'static str = "fee.assigned";
}

/// A fee payment was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePaymentReceived {
    /// The student ID.
    pub student_id: StudentId,
    /// Receipt number issued for the payment.
    pub receipt_number: String,
    /// Amount in minor currency units.
    pub amount_minor: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

impl EventKind for FeePaymentReceived {
    const EVENT_TYPE: &'static str = "fee.payment_received";
}
