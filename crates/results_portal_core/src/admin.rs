//! crates/results_portal_core/src/admin.rs
//!
//! Single-record flows used by staff outside of bulk import: saving sessions,
//! classes and results one at a time, creating exams, and soft-deleting records.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    is_upcoming_on, Class, Exam, ExamResult, NewClass, NewExam, NewResult, Session,
    DEFAULT_RESULT_STATUS, DEFAULT_STATUS_TEXT,
};
use crate::ports::{PortError, ResultStore};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("{0}")]
    Invalid(String),
    #[error("Same exam + roll number already exists.")]
    Duplicate,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// The single-result form. Text fields are trimmed before use.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultForm {
    pub exam_id: Option<Uuid>,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub roll_no: String,
    pub registration_no: Option<String>,
    #[serde(default)]
    pub student_name: String,
    pub dob: Option<String>,
    pub mobile: Option<String>,
    pub marks: Option<String>,
    pub status_text: Option<String>,
    pub result_status: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ResultForm {
    fn into_payload(self, exam_id: Uuid) -> Result<NewResult, AdminError> {
        let marks = match trimmed(self.marks) {
            None => None,
            Some(m) => Some(
                m.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| AdminError::Invalid("Marks must be a number.".to_string()))?,
            ),
        };
        Ok(NewResult {
            exam_id,
            roll_no: self.roll_no.trim().to_string(),
            registration_no: trimmed(self.registration_no),
            student_name: self.student_name.trim().to_string(),
            dob: trimmed(self.dob),
            mobile: trimmed(self.mobile),
            marks,
            status_text: trimmed(self.status_text)
                .unwrap_or_else(|| DEFAULT_STATUS_TEXT.to_string()),
            result_status: trimmed(self.result_status)
                .unwrap_or_else(|| DEFAULT_RESULT_STATUS.to_string()),
        })
    }
}

/// Find-or-create without a cache; single-record flows make one lookup each.
pub async fn ensure_session(
    store: &dyn ResultStore,
    name: &str,
) -> Result<Option<Session>, AdminError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    if let Some(session) = store.find_session_by_name(name).await? {
        return Ok(Some(session));
    }
    Ok(Some(store.insert_session(name).await?))
}

pub async fn ensure_class(
    store: &dyn ResultStore,
    name: &str,
    session_id: Option<Uuid>,
) -> Result<Option<Class>, AdminError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    if let Some(class) = store.find_class_by_name(name).await? {
        return Ok(Some(class));
    }
    let class = store
        .insert_class(NewClass {
            name: name.to_string(),
            session_id,
        })
        .await?;
    Ok(Some(class))
}

/// Creates a session, or renames `existing_id`.
///
/// Without an id an existing session of the same name is returned as is.
pub async fn save_session(
    store: &dyn ResultStore,
    name: &str,
    existing_id: Option<Uuid>,
) -> Result<Session, AdminError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AdminError::Invalid("Session name required.".to_string()));
    }
    if let Some(id) = existing_id {
        let session = store.update_session(id, name).await?;
        info!("Renamed session {} to {}", session.id, session.name);
        return Ok(session);
    }
    let session = ensure_session(store, name)
        .await?
        .ok_or_else(|| AdminError::Invalid("Session name required.".to_string()))?;
    Ok(session)
}

/// Saves a class under `session_id`.
///
/// The class to update is `existing_id` when given, else the class already
/// holding this name. With neither, a new class is inserted.
pub async fn save_class(
    store: &dyn ResultStore,
    name: &str,
    session_id: Option<Uuid>,
    existing_id: Option<Uuid>,
) -> Result<Class, AdminError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AdminError::Invalid("Class name required.".to_string()));
    }
    let target = match existing_id {
        Some(id) => Some(id),
        None => store.find_class_by_name(name).await?.map(|c| c.id),
    };
    let class = NewClass {
        name: name.to_string(),
        session_id,
    };
    match target {
        Some(id) => {
            let class = store.update_class(id, class).await?;
            info!("Updated class {} ({})", class.id, class.name);
            Ok(class)
        }
        None => {
            let class = store.insert_class(class).await?;
            info!("Saved class {} ({})", class.id, class.name);
            Ok(class)
        }
    }
}

/// Inserts a new result, or updates `existing_id` when editing.
///
/// A new result is refused when an active result already holds the same
/// `(exam, roll_no)`. Session and class named on the form are created if
/// missing.
pub async fn save_result(
    store: &dyn ResultStore,
    form: ResultForm,
    existing_id: Option<Uuid>,
) -> Result<ExamResult, AdminError> {
    if form.roll_no.trim().is_empty()
        || form.student_name.trim().is_empty()
        || form.class_name.trim().is_empty()
    {
        return Err(AdminError::Invalid(
            "Exam, class, roll no, student name required.".to_string(),
        ));
    }
    let exam_id = form
        .exam_id
        .ok_or_else(|| AdminError::Invalid("Please select exam from list.".to_string()))?;

    let session = ensure_session(store, &form.session).await?;
    ensure_class(store, &form.class_name, session.map(|s| s.id)).await?;

    let payload = form.into_payload(exam_id)?;
    let existing = store
        .find_active_result(payload.exam_id, &payload.roll_no)
        .await?;

    match existing_id {
        None => {
            if existing.is_some() {
                return Err(AdminError::Duplicate);
            }
            let saved = store.insert_result(payload).await?;
            info!("Saved result {} for roll {}", saved.id, saved.roll_no);
            Ok(saved)
        }
        Some(id) => {
            if existing.is_some_and(|r| r.id != id) {
                return Err(AdminError::Duplicate);
            }
            let saved = store.update_result(id, payload).await?;
            info!("Updated result {}", saved.id);
            Ok(saved)
        }
    }
}

/// Creates an exam unless one with the same name and date exists.
pub async fn create_exam(
    store: &dyn ResultStore,
    exam_name: &str,
    exam_date: &str,
    class_id: Option<Uuid>,
    session_id: Option<Uuid>,
    today: NaiveDate,
) -> Result<Exam, AdminError> {
    let (exam_name, exam_date) = (exam_name.trim(), exam_date.trim());
    if exam_name.is_empty() || exam_date.is_empty() {
        return Err(AdminError::Invalid(
            "Exam name and date required.".to_string(),
        ));
    }
    if let Some(exam) = store.find_exam(exam_name, exam_date).await? {
        return Ok(exam);
    }
    let exam = store
        .insert_exam(NewExam {
            exam_name: exam_name.to_string(),
            exam_date: exam_date.to_string(),
            class_id,
            session_id,
            is_upcoming: is_upcoming_on(exam_date, today),
        })
        .await?;
    info!("Created exam {} ({} on {})", exam.id, exam.exam_name, exam.exam_date);
    Ok(exam)
}

/// Kinds of record an admin can soft-delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Session,
    Class,
    Exam,
    Result,
}

/// Marks a record inactive. Nothing is ever removed.
pub async fn deactivate(
    store: &dyn ResultStore,
    kind: EntityKind,
    id: Uuid,
) -> Result<(), AdminError> {
    match kind {
        EntityKind::Session => store.soft_delete_session(id).await?,
        EntityKind::Class => store.soft_delete_class(id).await?,
        EntityKind::Exam => store.soft_delete_exam(id).await?,
        EntityKind::Result => store.soft_delete_result(id).await?,
    }
    info!("Deactivated {:?} {}", kind, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    async fn exam(store: &MemoryStore) -> Exam {
        create_exam(
            store,
            "GK 2026",
            "2026-02-08",
            None,
            None,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
        .await
        .unwrap()
    }

    fn form(exam_id: Uuid, roll_no: &str) -> ResultForm {
        ResultForm {
            exam_id: Some(exam_id),
            session: "2026".to_string(),
            class_name: "Class 5".to_string(),
            roll_no: roll_no.to_string(),
            student_name: " Amit Kumar ".to_string(),
            marks: Some("78".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn saves_with_defaults_and_creates_class() {
        let store = MemoryStore::new();
        let exam = exam(&store).await;

        let saved = save_result(&store, form(exam.id, "501"), None).await.unwrap();

        assert_eq!(saved.student_name, "Amit Kumar");
        assert_eq!(saved.marks, Some(78.0));
        assert_eq!(saved.status_text, "pass");
        assert_eq!(saved.result_status, "published");
        assert_eq!(store.classes().len(), 1);
        assert_eq!(store.sessions().len(), 1);
    }

    #[tokio::test]
    async fn refuses_second_active_result_but_allows_editing() {
        let store = MemoryStore::new();
        let exam = exam(&store).await;
        let saved = save_result(&store, form(exam.id, "501"), None).await.unwrap();

        let err = save_result(&store, form(exam.id, "501"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Duplicate));

        let mut edit = form(exam.id, "501");
        edit.marks = Some("81".to_string());
        let updated = save_result(&store, edit, Some(saved.id)).await.unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.marks, Some(81.0));
    }

    #[tokio::test]
    async fn soft_deleted_result_frees_the_roll_number() {
        let store = MemoryStore::new();
        let exam = exam(&store).await;
        let saved = save_result(&store, form(exam.id, "501"), None).await.unwrap();

        deactivate(&store, EntityKind::Result, saved.id).await.unwrap();
        assert!(save_result(&store, form(exam.id, "501"), None).await.is_ok());
        assert_eq!(store.results().len(), 2);
    }

    #[tokio::test]
    async fn rejects_missing_exam_and_bad_marks() {
        let store = MemoryStore::new();
        let exam = exam(&store).await;

        let mut no_exam = form(exam.id, "501");
        no_exam.exam_id = None;
        assert!(matches!(
            save_result(&store, no_exam, None).await,
            Err(AdminError::Invalid(_))
        ));

        let mut bad_marks = form(exam.id, "501");
        bad_marks.marks = Some("A+".to_string());
        assert!(matches!(
            save_result(&store, bad_marks, None).await,
            Err(AdminError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn save_class_updates_by_name_or_id() {
        let store = MemoryStore::new();
        let s2025 = save_session(&store, "2025", None).await.unwrap();
        let s2026 = save_session(&store, " 2026 ", None).await.unwrap();

        let created = save_class(&store, "Class 5", Some(s2025.id), None)
            .await
            .unwrap();
        let moved = save_class(&store, "Class 5", Some(s2026.id), None)
            .await
            .unwrap();
        assert_eq!(moved.id, created.id);
        assert_eq!(moved.session_id, Some(s2026.id));
        assert_eq!(store.classes().len(), 1);

        let renamed = save_class(&store, "Class 5A", Some(s2026.id), Some(created.id))
            .await
            .unwrap();
        assert_eq!(renamed.id, created.id);
        assert_eq!(renamed.name, "Class 5A");
        assert_eq!(store.calls().class_inserts, 1);
    }

    #[tokio::test]
    async fn save_class_rejects_blank_and_taken_names() {
        let store = MemoryStore::new();
        assert!(matches!(
            save_class(&store, "  ", None, None).await,
            Err(AdminError::Invalid(_))
        ));

        save_class(&store, "Class 5", None, None).await.unwrap();
        let other = save_class(&store, "Class 6", None, None).await.unwrap();
        assert!(matches!(
            save_class(&store, "Class 5", None, Some(other.id)).await,
            Err(AdminError::Port(PortError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn save_session_finds_existing_and_renames() {
        let store = MemoryStore::new();
        let first = save_session(&store, "2026", None).await.unwrap();
        let again = save_session(&store, "2026", None).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(store.sessions().len(), 1);

        let renamed = save_session(&store, "2026-27", Some(first.id)).await.unwrap();
        assert_eq!(renamed.id, first.id);
        assert_eq!(renamed.name, "2026-27");

        assert!(matches!(
            save_session(&store, "", None).await,
            Err(AdminError::Invalid(_))
        ));
        assert!(matches!(
            save_session(&store, "2027", Some(Uuid::new_v4())).await,
            Err(AdminError::Port(PortError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn create_exam_is_idempotent() {
        let store = MemoryStore::new();
        let first = exam(&store).await;
        let second = exam(&store).await;

        assert_eq!(first.id, second.id);
        assert!(first.is_upcoming);
        assert_eq!(store.calls().exam_inserts, 1);
    }
}
