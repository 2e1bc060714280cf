//! Attendance events.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::EventKind;
use crate::types::StudentId;

/// Attendance mark for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    /// Present for the day.
    Present,
    /// Absent without excuse.
    Absent,
    /// Arrived late.
    Late,
    /// Absent with an approved excuse.
    Excused,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
            Self::Excused => "excused",
        };
        f.write_str(s)
    }
}

/// A student's attendance was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceMarked {
    /// The student ID.
    pub student_id: StudentId,
    /// Day the mark applies to.
    pub date: NaiveDate,
    /// The mark.
    pub status: AttendanceStatus,
}

impl EventKind for AttendanceMarked {
    const EVENT_TYPE: &'static str = "attendance.marked";
}
