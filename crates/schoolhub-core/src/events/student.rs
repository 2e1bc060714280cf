//! Student lifecycle events.

use serde::{Deserialize, Serialize};

use super::EventKind;
use crate::types::StudentId;

/// A student was admitted and enrolled into a grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentEnrolled {
    /// The student ID.
    pub student_id: StudentId,
    /// School-issued admission number.
    pub admission_number: String,
    /// Student's full name.
    pub full_name: String,
    /// Grade (class) the student joined.
    pub grade: String,
    /// Section within the grade.
    #[serde(default)]
    pub section: Option<String>,
    /// Academic year, e.g. `2024-25`.
    pub academic_year: String,
    /// Guardian contact for notifications.
    #[serde(default)]
    pub guardian_email: Option<String>,
}

impl EventKind for StudentEnrolled {
    const EVENT_TYPE: &'static str = "student.enrolled";
}

/// A student left the school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentWithdrawn {
    /// The student ID.
    pub student_id: StudentId,
    /// Withdrawal reason, if recorded.
    #[serde(default)]
    pub reason: Option<String>,
}

impl EventKind for StudentWithdrawn {
    const EVENT_TYPE: &'static str = "student.withdrawn";
}
