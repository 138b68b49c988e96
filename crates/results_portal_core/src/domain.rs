//! crates/results_portal_core/src/domain.rs
//!
//! Defines the pure, core data structures for the results portal.
//! These structs are independent of any database or spreadsheet format.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `status_text` written when a row or form leaves it blank.
pub const DEFAULT_STATUS_TEXT: &str = "pass";
/// `result_status` written when a row or form leaves it blank.
pub const DEFAULT_RESULT_STATUS: &str = "published";
/// The `result_status` value students are allowed to see.
pub const PUBLISHED: &str = "published";

/// Soft-delete flag carried by every persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Inactive => "inactive",
        }
    }

    /// Anything other than `inactive` is treated as active.
    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("inactive") {
            RecordStatus::Inactive
        } else {
            RecordStatus::Active
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RecordStatus::Active)
    }
}

/// An academic period (usually a year) grouping classes and exams.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub name: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

/// A grade or cohort. Unique by name alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Class {
    pub id: Uuid,
    pub name: String,
    pub session_id: Option<Uuid>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

/// A named, dated assessment. Unique by `(exam_name, exam_date)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exam {
    pub id: Uuid,
    pub exam_name: String,
    /// Kept as entered (normally `YYYY-MM-DD`).
    pub exam_date: String,
    pub class_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub is_upcoming: bool,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl Exam {
    /// Recomputes the upcoming flag from the date. Falls back to the stored
    /// flag when the date is not `YYYY-MM-DD`.
    pub fn refresh_upcoming(&mut self, today: NaiveDate) {
        if let Ok(date) = NaiveDate::parse_from_str(self.exam_date.trim(), "%Y-%m-%d") {
            self.is_upcoming = date >= today;
        }
    }
}

/// One student's outcome for one exam.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamResult {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub roll_no: String,
    pub registration_no: Option<String>,
    pub student_name: String,
    pub dob: Option<String>,
    pub mobile: Option<String>,
    pub marks: Option<f64>,
    pub status_text: String,
    pub result_status: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Write Payloads
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NewClass {
    pub name: String,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExam {
    pub exam_name: String,
    pub exam_date: String,
    pub class_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub is_upcoming: bool,
}

/// Admin edits to an existing exam.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExamUpdate {
    pub exam_name: String,
    pub exam_date: String,
    pub class_id: Option<Uuid>,
    pub is_upcoming: bool,
}

/// The insert/update payload for a result. New rows are always stored active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResult {
    pub exam_id: Uuid,
    pub roll_no: String,
    pub registration_no: Option<String>,
    pub student_name: String,
    pub dob: Option<String>,
    pub mobile: Option<String>,
    pub marks: Option<f64>,
    pub status_text: String,
    pub result_status: String,
}

/// Filters for the published-result search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultQuery {
    /// Matched against `roll_no` OR `registration_no`.
    pub identifier: String,
    /// Restrict to these exams when set.
    pub exam_ids: Option<Vec<Uuid>>,
    pub dob: Option<String>,
    pub mobile: Option<String>,
    pub published_only: bool,
}

/// Whether an exam dated `exam_date` is still ahead of `today`.
///
/// Dates that do not parse as `YYYY-MM-DD` are never upcoming.
pub fn is_upcoming_on(exam_date: &str, today: NaiveDate) -> bool {
    NaiveDate::parse_from_str(exam_date.trim(), "%Y-%m-%d")
        .map(|date| date >= today)
        .unwrap_or(false)
}
