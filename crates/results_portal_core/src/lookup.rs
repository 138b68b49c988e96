//! crates/results_portal_core/src/lookup.rs
//!
//! The public, student-facing search for a published result.

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Class, Exam, ExamResult, ResultQuery, Session};
use crate::ports::{PortError, PortResult, ResultStore};

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Please enter roll number or registration number.")]
    MissingIdentifier,
    #[error("No exams found for the selected session.")]
    NoExamsInSession,
    #[error("No published result found.")]
    NotFound,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// A result together with the exam it belongs to and that exam's context.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedResult {
    pub result: ExamResult,
    pub exam: Exam,
    pub session: Option<Session>,
    pub class: Option<Class>,
}

/// Finds the newest published, active result for `identifier`.
///
/// `identifier` matches the roll number or the registration number. A
/// `guard` containing `-` is read as a date of birth, anything else as a
/// mobile number; the result must carry the same value.
pub async fn find_published_result(
    store: &dyn ResultStore,
    identifier: &str,
    session_id: Option<Uuid>,
    guard: Option<&str>,
) -> Result<PublishedResult, LookupError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(LookupError::MissingIdentifier);
    }

    let mut query = ResultQuery {
        identifier: identifier.to_string(),
        published_only: true,
        ..Default::default()
    };

    if let Some(session_id) = session_id {
        let exam_ids: Vec<Uuid> = store
            .list_exams(true)
            .await?
            .into_iter()
            .filter(|exam| exam.session_id == Some(session_id))
            .map(|exam| exam.id)
            .collect();
        if exam_ids.is_empty() {
            return Err(LookupError::NoExamsInSession);
        }
        query.exam_ids = Some(exam_ids);
    }

    match guard.map(str::trim).filter(|g| !g.is_empty()) {
        Some(g) if g.contains('-') => query.dob = Some(g.to_string()),
        Some(g) => query.mobile = Some(g.to_string()),
        None => {}
    }

    let result = store
        .search_results(&query)
        .await?
        .into_iter()
        .next()
        .ok_or(LookupError::NotFound)?;
    debug!("Lookup for {} matched result {}", identifier, result.id);

    let exam = store.get_exam(result.exam_id).await?;
    let session = match exam.session_id {
        Some(id) => optional(store.get_session(id).await)?,
        None => None,
    };
    let class = match exam.class_id {
        Some(id) => optional(store.get_class(id).await)?,
        None => None,
    };

    Ok(PublishedResult {
        result,
        exam,
        session,
        class,
    })
}

/// A missing parent record is shown as blank rather than failing the lookup.
fn optional<T>(found: PortResult<T>) -> PortResult<Option<T>> {
    match found {
        Ok(value) => Ok(Some(value)),
        Err(PortError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
