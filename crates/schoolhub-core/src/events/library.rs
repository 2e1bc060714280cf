//! Library circulation events.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EventKind;

/// A book was issued to a library member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryBookIssued {
    /// Library member (student or staff) ID.
    pub member_id: Uuid,
    /// Book copy ID.
    pub book_id: Uuid,
    /// Book title.
    pub title: String,
    /// Return due date.
    pub due_date: NaiveDate,
}

impl EventKind for LibraryBookIssued {
    const EVENT_TYPE: &'static str = "library.book_issued";
}

/// An issued book passed its due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryBookOverdue {
    /// Library member ID.
    pub member_id: Uuid,
    /// Book copy ID.
    pub book_id: Uuid,
    /// Book title.
    pub title: String,
    /// Days past the due date.
    pub days_overdue: u32,
}

impl EventKind for LibraryBookOverdue {
    const EVENT_TYPE: &'static str = "library.book_overdue";
}
