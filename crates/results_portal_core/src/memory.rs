//! crates/results_portal_core/src/memory.rs
//!
//! An in-memory `ResultStore`. It enforces the same uniqueness rules as the
//! Postgres schema, counts calls so tests can assert on round-trips, and can
//! be told to fail specific operations.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Class, Exam, ExamResult, ExamUpdate, NewClass, NewExam, NewResult, RecordStatus, ResultQuery,
    Session, PUBLISHED,
};
use crate::ports::{PortError, PortResult, ResultStore};

/// How many times each store operation was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub session_lookups: usize,
    pub session_inserts: usize,
    pub class_lookups: usize,
    pub class_inserts: usize,
    pub exam_lookups: usize,
    pub exam_inserts: usize,
    pub result_lookups: usize,
    pub batch_inserts: usize,
}

#[derive(Default)]
struct Inner {
    sessions: Vec<Session>,
    classes: Vec<Class>,
    exams: Vec<Exam>,
    results: Vec<ExamResult>,
    calls: StoreCalls,
    failing_batches: HashSet<usize>,
    fail_exam_inserts: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `n`th call (1-based) to `insert_results` fail.
    pub fn fail_batch(&self, n: usize) {
        self.lock().failing_batches.insert(n);
    }

    /// Makes every `insert_exam` call fail.
    pub fn fail_exam_inserts(&self) {
        self.lock().fail_exam_inserts = true;
    }

    pub fn calls(&self) -> StoreCalls {
        self.lock().calls
    }

    /// Every stored result, including soft-deleted ones.
    pub fn results(&self) -> Vec<ExamResult> {
        self.lock().results.clone()
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.lock().sessions.clone()
    }

    pub fn classes(&self) -> Vec<Class> {
        self.lock().classes.clone()
    }

    pub fn exams(&self) -> Vec<Exam> {
        self.lock().exams.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock only happens in a failing test.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn not_found(kind: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{} {} not found", kind, id))
}

fn build_result(result: NewResult) -> ExamResult {
    ExamResult {
        id: Uuid::new_v4(),
        exam_id: result.exam_id,
        roll_no: result.roll_no,
        registration_no: result.registration_no,
        student_name: result.student_name,
        dob: result.dob,
        mobile: result.mobile,
        marks: result.marks,
        status_text: result.status_text,
        result_status: result.result_status,
        status: RecordStatus::Active,
        created_at: Utc::now(),
    }
}

fn active_pair_taken(
    results: &[ExamResult],
    exam_id: Uuid,
    roll_no: &str,
    skip: Option<Uuid>,
) -> bool {
    results.iter().any(|r| {
        r.status.is_active() && r.exam_id == exam_id && r.roll_no == roll_no && Some(r.id) != skip
    })
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn find_session_by_name(&self, name: &str) -> PortResult<Option<Session>> {
        let mut inner = self.lock();
        inner.calls.session_lookups += 1;
        Ok(inner.sessions.iter().find(|s| s.name == name).cloned())
    }

    async fn get_session(&self, id: Uuid) -> PortResult<Session> {
        let inner = self.lock();
        inner
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| not_found("Session", id))
    }

    async fn insert_session(&self, name: &str) -> PortResult<Session> {
        let mut inner = self.lock();
        inner.calls.session_inserts += 1;
        if inner.sessions.iter().any(|s| s.name == name) {
            return Err(PortError::Conflict(format!("Session '{}' already exists", name)));
        }
        let session = Session {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: RecordStatus::Active,
            created_at: Utc::now(),
        };
        inner.sessions.push(session.clone());
        Ok(session)
    }

    async fn update_session(&self, id: Uuid, name: &str) -> PortResult<Session> {
        let mut inner = self.lock();
        if inner.sessions.iter().any(|s| s.name == name && s.id != id) {
            return Err(PortError::Conflict(format!("Session '{}' already exists", name)));
        }
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found("Session", id))?;
        session.name = name.to_string();
        Ok(session.clone())
    }

    async fn soft_delete_session(&self, id: Uuid) -> PortResult<()> {
        let mut inner = self.lock();
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found("Session", id))?;
        session.status = RecordStatus::Inactive;
        Ok(())
    }

    async fn list_sessions(&self, active_only: bool) -> PortResult<Vec<Session>> {
        let inner = self.lock();
        let mut sessions: Vec<Session> = inner
            .sessions
            .iter()
            .filter(|s| !active_only || s.status.is_active())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(sessions)
    }

    async fn find_class_by_name(&self, name: &str) -> PortResult<Option<Class>> {
        let mut inner = self.lock();
        inner.calls.class_lookups += 1;
        Ok(inner.classes.iter().find(|c| c.name == name).cloned())
    }

    async fn get_class(&self, id: Uuid) -> PortResult<Class> {
        let inner = self.lock();
        inner
            .classes
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| not_found("Class", id))
    }

    async fn insert_class(&self, class: NewClass) -> PortResult<Class> {
        let mut inner = self.lock();
        inner.calls.class_inserts += 1;
        if inner.classes.iter().any(|c| c.name == class.name) {
            return Err(PortError::Conflict(format!(
                "Class '{}' already exists",
                class.name
            )));
        }
        let class = Class {
            id: Uuid::new_v4(),
            name: class.name,
            session_id: class.session_id,
            status: RecordStatus::Active,
            created_at: Utc::now(),
        };
        inner.classes.push(class.clone());
        Ok(class)
    }

    async fn update_class(&self, id: Uuid, update: NewClass) -> PortResult<Class> {
        let mut inner = self.lock();
        if inner.classes.iter().any(|c| c.name == update.name && c.id != id) {
            return Err(PortError::Conflict(format!(
                "Class '{}' already exists",
                update.name
            )));
        }
        let class = inner
            .classes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found("Class", id))?;
        class.name = update.name;
        class.session_id = update.session_id;
        Ok(class.clone())
    }

    async fn soft_delete_class(&self, id: Uuid) -> PortResult<()> {
        let mut inner = self.lock();
        let class = inner
            .classes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found("Class", id))?;
        class.status = RecordStatus::Inactive;
        Ok(())
    }

    async fn list_classes(&self, active_only: bool) -> PortResult<Vec<Class>> {
        let inner = self.lock();
        let mut classes: Vec<Class> = inner
            .classes
            .iter()
            .filter(|c| !active_only || c.status.is_active())
            .cloned()
            .collect();
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }

    async fn find_exam(&self, exam_name: &str, exam_date: &str) -> PortResult<Option<Exam>> {
        let mut inner = self.lock();
        inner.calls.exam_lookups += 1;
        Ok(inner
            .exams
            .iter()
            .find(|e| e.exam_name == exam_name && e.exam_date == exam_date)
            .cloned())
    }

    async fn get_exam(&self, id: Uuid) -> PortResult<Exam> {
        let inner = self.lock();
        inner
            .exams
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| not_found("Exam", id))
    }

    async fn insert_exam(&self, exam: NewExam) -> PortResult<Exam> {
        let mut inner = self.lock();
        inner.calls.exam_inserts += 1;
        if inner.fail_exam_inserts {
            return Err(PortError::Unexpected("exam insert rejected".to_string()));
        }
        if inner
            .exams
            .iter()
            .any(|e| e.exam_name == exam.exam_name && e.exam_date == exam.exam_date)
        {
            return Err(PortError::Conflict(format!(
                "Exam '{}' on {} already exists",
                exam.exam_name, exam.exam_date
            )));
        }
        let exam = Exam {
            id: Uuid::new_v4(),
            exam_name: exam.exam_name,
            exam_date: exam.exam_date,
            class_id: exam.class_id,
            session_id: exam.session_id,
            is_upcoming: exam.is_upcoming,
            status: RecordStatus::Active,
            created_at: Utc::now(),
        };
        inner.exams.push(exam.clone());
        Ok(exam)
    }

    async fn update_exam(&self, id: Uuid, update: ExamUpdate) -> PortResult<Exam> {
        let mut inner = self.lock();
        let exam = inner
            .exams
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| not_found("Exam", id))?;
        exam.exam_name = update.exam_name;
        exam.exam_date = update.exam_date;
        exam.class_id = update.class_id;
        exam.is_upcoming = update.is_upcoming;
        Ok(exam.clone())
    }

    async fn soft_delete_exam(&self, id: Uuid) -> PortResult<()> {
        let mut inner = self.lock();
        let exam = inner
            .exams
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| not_found("Exam", id))?;
        exam.status = RecordStatus::Inactive;
        Ok(())
    }

    async fn list_exams(&self, active_only: bool) -> PortResult<Vec<Exam>> {
        let inner = self.lock();
        let mut exams: Vec<Exam> = inner
            .exams
            .iter()
            .filter(|e| !active_only || e.status.is_active())
            .cloned()
            .collect();
        exams.sort_by(|a, b| {
            b.exam_date
                .cmp(&a.exam_date)
                .then_with(|| a.exam_name.cmp(&b.exam_name))
        });
        Ok(exams)
    }

    async fn find_active_result(
        &self,
        exam_id: Uuid,
        roll_no: &str,
    ) -> PortResult<Option<ExamResult>> {
        let mut inner = self.lock();
        inner.calls.result_lookups += 1;
        Ok(inner
            .results
            .iter()
            .find(|r| r.status.is_active() && r.exam_id == exam_id && r.roll_no == roll_no)
            .cloned())
    }

    async fn get_result(&self, id: Uuid) -> PortResult<ExamResult> {
        let inner = self.lock();
        inner
            .results
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found("Result", id))
    }

    async fn insert_result(&self, result: NewResult) -> PortResult<ExamResult> {
        let mut inner = self.lock();
        if active_pair_taken(&inner.results, result.exam_id, &result.roll_no, None) {
            return Err(PortError::Conflict(format!(
                "Roll number {} already has a result for this exam",
                result.roll_no
            )));
        }
        let stored = build_result(result);
        inner.results.push(stored.clone());
        Ok(stored)
    }

    async fn insert_results(&self, results: Vec<NewResult>) -> PortResult<usize> {
        let mut inner = self.lock();
        inner.calls.batch_inserts += 1;
        let call = inner.calls.batch_inserts;
        if inner.failing_batches.contains(&call) {
            return Err(PortError::Unexpected(format!("batch insert {} rejected", call)));
        }

        let mut seen = HashSet::new();
        for r in &results {
            if !seen.insert((r.exam_id, r.roll_no.as_str()))
                || active_pair_taken(&inner.results, r.exam_id, &r.roll_no, None)
            {
                return Err(PortError::Conflict(format!(
                    "duplicate key value for roll number {}",
                    r.roll_no
                )));
            }
        }

        let count = results.len();
        inner.results.extend(results.into_iter().map(build_result));
        Ok(count)
    }

    async fn update_result(&self, id: Uuid, update: NewResult) -> PortResult<ExamResult> {
        let mut inner = self.lock();
        if active_pair_taken(&inner.results, update.exam_id, &update.roll_no, Some(id)) {
            return Err(PortError::Conflict(format!(
                "Roll number {} already has a result for this exam",
                update.roll_no
            )));
        }
        let result = inner
            .results
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("Result", id))?;
        result.exam_id = update.exam_id;
        result.roll_no = update.roll_no;
        result.registration_no = update.registration_no;
        result.student_name = update.student_name;
        result.dob = update.dob;
        result.mobile = update.mobile;
        result.marks = update.marks;
        result.status_text = update.status_text;
        result.result_status = update.result_status;
        Ok(result.clone())
    }

    async fn soft_delete_result(&self, id: Uuid) -> PortResult<()> {
        let mut inner = self.lock();
        let result = inner
            .results
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("Result", id))?;
        result.status = RecordStatus::Inactive;
        Ok(())
    }

    async fn search_results(&self, query: &ResultQuery) -> PortResult<Vec<ExamResult>> {
        let inner = self.lock();
        let mut found: Vec<ExamResult> = inner
            .results
            .iter()
            .filter(|r| r.status.is_active())
            .filter(|r| {
                r.roll_no == query.identifier
                    || r.registration_no.as_deref() == Some(query.identifier.as_str())
            })
            .filter(|r| !query.published_only || r.result_status == PUBLISHED)
            .filter(|r| {
                query
                    .exam_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&r.exam_id))
            })
            .filter(|r| query.dob.is_none() || r.dob == query.dob)
            .filter(|r| query.mobile.is_none() || r.mobile == query.mobile)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}
