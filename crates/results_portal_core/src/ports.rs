//! crates/results_portal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the portal's core logic.
//! The import pipeline and the admin flows only ever talk to storage through
//! `ResultStore`, which keeps them independent of any particular database.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Class, Exam, ExamResult, ExamUpdate, NewClass, NewExam, NewResult, ResultQuery, Session,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflicting record: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for sessions, classes, exams and results.
///
/// Every call may suspend and every call may fail on its own; callers decide
/// whether a failure is fatal.
#[async_trait]
pub trait ResultStore: Send + Sync {
    // --- Sessions ---
    async fn find_session_by_name(&self, name: &str) -> PortResult<Option<Session>>;

    async fn get_session(&self, id: Uuid) -> PortResult<Session>;

    async fn insert_session(&self, name: &str) -> PortResult<Session>;

    async fn update_session(&self, id: Uuid, name: &str) -> PortResult<Session>;

    async fn soft_delete_session(&self, id: Uuid) -> PortResult<()>;

    async fn list_sessions(&self, active_only: bool) -> PortResult<Vec<Session>>;

    // --- Classes ---
    /// Looks a class up by name only; classes are not scoped to a session.
    async fn find_class_by_name(&self, name: &str) -> PortResult<Option<Class>>;

    async fn get_class(&self, id: Uuid) -> PortResult<Class>;

    async fn insert_class(&self, class: NewClass) -> PortResult<Class>;

    async fn update_class(&self, id: Uuid, class: NewClass) -> PortResult<Class>;

    async fn soft_delete_class(&self, id: Uuid) -> PortResult<()>;

    async fn list_classes(&self, active_only: bool) -> PortResult<Vec<Class>>;

    // --- Exams ---
    async fn find_exam(&self, exam_name: &str, exam_date: &str) -> PortResult<Option<Exam>>;

    async fn get_exam(&self, id: Uuid) -> PortResult<Exam>;

    async fn insert_exam(&self, exam: NewExam) -> PortResult<Exam>;

    async fn update_exam(&self, id: Uuid, exam: ExamUpdate) -> PortResult<Exam>;

    async fn soft_delete_exam(&self, id: Uuid) -> PortResult<()>;

    async fn list_exams(&self, active_only: bool) -> PortResult<Vec<Exam>>;

    // --- Results ---
    /// Finds the active result for `(exam_id, roll_no)`, ignoring soft-deleted rows.
    async fn find_active_result(&self, exam_id: Uuid, roll_no: &str)
        -> PortResult<Option<ExamResult>>;

    async fn get_result(&self, id: Uuid) -> PortResult<ExamResult>;

    async fn insert_result(&self, result: NewResult) -> PortResult<ExamResult>;

    /// Inserts a whole batch or nothing. Returns the number of rows written.
    async fn insert_results(&self, results: Vec<NewResult>) -> PortResult<usize>;

    async fn update_result(&self, id: Uuid, result: NewResult) -> PortResult<ExamResult>;

    async fn soft_delete_result(&self, id: Uuid) -> PortResult<()>;

    /// Active results matching the query, newest first.
    async fn search_results(&self, query: &ResultQuery) -> PortResult<Vec<ExamResult>>;
}
