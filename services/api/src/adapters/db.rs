//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ResultStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use results_portal_core::domain::{
    Class, Exam, ExamResult, ExamUpdate, NewClass, NewExam, NewResult, RecordStatus, ResultQuery,
    Session,
};
use results_portal_core::ports::{PortError, PortResult, ResultStore};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

/// Postgres caps a statement at 65535 bind parameters; results use nine each.
const MAX_ROWS_PER_STATEMENT: usize = 5000;

const SESSION_COLUMNS: &str = "id, name, status, created_at";
const CLASS_COLUMNS: &str = "id, name, session_id, status, created_at";
const EXAM_COLUMNS: &str =
    "id, exam_name, exam_date, class_id, session_id, is_upcoming, status, created_at";
const RESULT_COLUMNS: &str = "id, exam_id, roll_no, registration_no, student_name, dob, mobile, \
     marks, status_text, result_status, status, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ResultStore` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps unique-violation errors to `Conflict` and a missing row to `NotFound`.
fn map_err(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{} not found", what())),
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            PortError::Conflict(format!("{}: {}", what(), db.message()))
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    name: String,
    status: String,
    created_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> Session {
        Session {
            id: self.id,
            name: self.name,
            status: RecordStatus::from_db(&self.status),
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ClassRecord {
    id: Uuid,
    name: String,
    session_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
}
impl ClassRecord {
    fn to_domain(self) -> Class {
        Class {
            id: self.id,
            name: self.name,
            session_id: self.session_id,
            status: RecordStatus::from_db(&self.status),
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ExamRecord {
    id: Uuid,
    exam_name: String,
    exam_date: String,
    class_id: Option<Uuid>,
    session_id: Option<Uuid>,
    is_upcoming: bool,
    status: String,
    created_at: DateTime<Utc>,
}
impl ExamRecord {
    fn to_domain(self) -> Exam {
        Exam {
            id: self.id,
            exam_name: self.exam_name,
            exam_date: self.exam_date,
            class_id: self.class_id,
            session_id: self.session_id,
            is_upcoming: self.is_upcoming,
            status: RecordStatus::from_db(&self.status),
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ResultRecord {
    id: Uuid,
    exam_id: Uuid,
    roll_no: String,
    registration_no: Option<String>,
    student_name: String,
    dob: Option<String>,
    mobile: Option<String>,
    marks: Option<f64>,
    status_text: String,
    result_status: String,
    status: String,
    created_at: DateTime<Utc>,
}
impl ResultRecord {
    fn to_domain(self) -> ExamResult {
        ExamResult {
            id: self.id,
            exam_id: self.exam_id,
            roll_no: self.roll_no,
            registration_no: self.registration_no,
            student_name: self.student_name,
            dob: self.dob,
            mobile: self.mobile,
            marks: self.marks,
            status_text: self.status_text,
            result_status: self.result_status,
            status: RecordStatus::from_db(&self.status),
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `ResultStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ResultStore for PgStore {
    // --- Sessions ---
    async fn find_session_by_name(&self, name: &str) -> PortResult<Option<Session>> {
        let sql = format!("SELECT {} FROM sessions WHERE name = $1", SESSION_COLUMNS);
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(SessionRecord::to_domain))
    }

    async fn get_session(&self, id: Uuid) -> PortResult<Session> {
        let sql = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Session {}", id)))?;
        Ok(record.to_domain())
    }

    async fn insert_session(&self, name: &str) -> PortResult<Session> {
        let sql = format!(
            "INSERT INTO sessions (id, name, status) VALUES ($1, $2, 'active') RETURNING {}",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Session '{}'", name)))?;
        Ok(record.to_domain())
    }

    async fn update_session(&self, id: Uuid, name: &str) -> PortResult<Session> {
        let sql = format!(
            "UPDATE sessions SET name = $2 WHERE id = $1 RETURNING {}",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(id)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Session {}", id)))?;
        Ok(record.to_domain())
    }

    async fn soft_delete_session(&self, id: Uuid) -> PortResult<()> {
        self.deactivate("sessions", "Session", id).await
    }

    async fn list_sessions(&self, active_only: bool) -> PortResult<Vec<Session>> {
        let sql = format!(
            "SELECT {} FROM sessions WHERE ($1 = FALSE OR status = 'active') ORDER BY name DESC",
            SESSION_COLUMNS
        );
        let records = sqlx::query_as::<_, SessionRecord>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Classes ---
    async fn find_class_by_name(&self, name: &str) -> PortResult<Option<Class>> {
        let sql = format!("SELECT {} FROM classes WHERE name = $1", CLASS_COLUMNS);
        let record = sqlx::query_as::<_, ClassRecord>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(ClassRecord::to_domain))
    }

    async fn get_class(&self, id: Uuid) -> PortResult<Class> {
        let sql = format!("SELECT {} FROM classes WHERE id = $1", CLASS_COLUMNS);
        let record = sqlx::query_as::<_, ClassRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Class {}", id)))?;
        Ok(record.to_domain())
    }

    async fn insert_class(&self, class: NewClass) -> PortResult<Class> {
        let sql = format!(
            "INSERT INTO classes (id, name, session_id, status) VALUES ($1, $2, $3, 'active') \
             RETURNING {}",
            CLASS_COLUMNS
        );
        let record = sqlx::query_as::<_, ClassRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&class.name)
            .bind(class.session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Class '{}'", class.name)))?;
        Ok(record.to_domain())
    }

    async fn update_class(&self, id: Uuid, class: NewClass) -> PortResult<Class> {
        let sql = format!(
            "UPDATE classes SET name = $2, session_id = $3 WHERE id = $1 RETURNING {}",
            CLASS_COLUMNS
        );
        let record = sqlx::query_as::<_, ClassRecord>(&sql)
            .bind(id)
            .bind(&class.name)
            .bind(class.session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Class {}", id)))?;
        Ok(record.to_domain())
    }

    async fn soft_delete_class(&self, id: Uuid) -> PortResult<()> {
        self.deactivate("classes", "Class", id).await
    }

    async fn list_classes(&self, active_only: bool) -> PortResult<Vec<Class>> {
        let sql = format!(
            "SELECT {} FROM classes WHERE ($1 = FALSE OR status = 'active') ORDER BY name ASC",
            CLASS_COLUMNS
        );
        let records = sqlx::query_as::<_, ClassRecord>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Exams ---
    async fn find_exam(&self, exam_name: &str, exam_date: &str) -> PortResult<Option<Exam>> {
        let sql = format!(
            "SELECT {} FROM exams WHERE exam_name = $1 AND exam_date = $2",
            EXAM_COLUMNS
        );
        let record = sqlx::query_as::<_, ExamRecord>(&sql)
            .bind(exam_name)
            .bind(exam_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(ExamRecord::to_domain))
    }

    async fn get_exam(&self, id: Uuid) -> PortResult<Exam> {
        let sql = format!("SELECT {} FROM exams WHERE id = $1", EXAM_COLUMNS);
        let record = sqlx::query_as::<_, ExamRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Exam {}", id)))?;
        Ok(record.to_domain())
    }

    async fn insert_exam(&self, exam: NewExam) -> PortResult<Exam> {
        let sql = format!(
            "INSERT INTO exams (id, exam_name, exam_date, class_id, session_id, is_upcoming, status) \
             VALUES ($1, $2, $3, $4, $5, $6, 'active') RETURNING {}",
            EXAM_COLUMNS
        );
        let record = sqlx::query_as::<_, ExamRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&exam.exam_name)
            .bind(&exam.exam_date)
            .bind(exam.class_id)
            .bind(exam.session_id)
            .bind(exam.is_upcoming)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                map_err(e, || format!("Exam '{}' on {}", exam.exam_name, exam.exam_date))
            })?;
        Ok(record.to_domain())
    }

    async fn update_exam(&self, id: Uuid, exam: ExamUpdate) -> PortResult<Exam> {
        let sql = format!(
            "UPDATE exams SET exam_name = $2, exam_date = $3, class_id = $4, is_upcoming = $5 \
             WHERE id = $1 RETURNING {}",
            EXAM_COLUMNS
        );
        let record = sqlx::query_as::<_, ExamRecord>(&sql)
            .bind(id)
            .bind(&exam.exam_name)
            .bind(&exam.exam_date)
            .bind(exam.class_id)
            .bind(exam.is_upcoming)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Exam {}", id)))?;
        Ok(record.to_domain())
    }

    async fn soft_delete_exam(&self, id: Uuid) -> PortResult<()> {
        self.deactivate("exams", "Exam", id).await
    }

    async fn list_exams(&self, active_only: bool) -> PortResult<Vec<Exam>> {
        let sql = format!(
            "SELECT {} FROM exams WHERE ($1 = FALSE OR status = 'active') \
             ORDER BY exam_date DESC, exam_name ASC",
            EXAM_COLUMNS
        );
        let records = sqlx::query_as::<_, ExamRecord>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Results ---
    async fn find_active_result(
        &self,
        exam_id: Uuid,
        roll_no: &str,
    ) -> PortResult<Option<ExamResult>> {
        let sql = format!(
            "SELECT {} FROM results WHERE exam_id = $1 AND roll_no = $2 AND status = 'active'",
            RESULT_COLUMNS
        );
        let record = sqlx::query_as::<_, ResultRecord>(&sql)
            .bind(exam_id)
            .bind(roll_no)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(ResultRecord::to_domain))
    }

    async fn get_result(&self, id: Uuid) -> PortResult<ExamResult> {
        let sql = format!("SELECT {} FROM results WHERE id = $1", RESULT_COLUMNS);
        let record = sqlx::query_as::<_, ResultRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Result {}", id)))?;
        Ok(record.to_domain())
    }

    async fn insert_result(&self, result: NewResult) -> PortResult<ExamResult> {
        let sql = format!(
            "INSERT INTO results (id, exam_id, roll_no, registration_no, student_name, dob, \
             mobile, marks, status_text, result_status, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active') RETURNING {}",
            RESULT_COLUMNS
        );
        let record = sqlx::query_as::<_, ResultRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(result.exam_id)
            .bind(&result.roll_no)
            .bind(&result.registration_no)
            .bind(&result.student_name)
            .bind(&result.dob)
            .bind(&result.mobile)
            .bind(result.marks)
            .bind(&result.status_text)
            .bind(&result.result_status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Result for roll {}", result.roll_no)))?;
        Ok(record.to_domain())
    }

    async fn insert_results(&self, results: Vec<NewResult>) -> PortResult<usize> {
        if results.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut written = 0;

        for chunk in results.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO results (id, exam_id, roll_no, registration_no, student_name, dob, \
                 mobile, marks, status_text, result_status, status) ",
            );
            builder.push_values(chunk, |mut row, r| {
                row.push_bind(Uuid::new_v4())
                    .push_bind(r.exam_id)
                    .push_bind(&r.roll_no)
                    .push_bind(&r.registration_no)
                    .push_bind(&r.student_name)
                    .push_bind(&r.dob)
                    .push_bind(&r.mobile)
                    .push_bind(r.marks)
                    .push_bind(&r.status_text)
                    .push_bind(&r.result_status)
                    .push("'active'");
            });
            let done = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| map_err(e, || "Result batch".to_string()))?;
            written += done.rows_affected() as usize;
        }

        tx.commit().await.map_err(unexpected)?;
        debug!("Inserted {} results in one transaction", written);
        Ok(written)
    }

    async fn update_result(&self, id: Uuid, result: NewResult) -> PortResult<ExamResult> {
        let sql = format!(
            "UPDATE results SET exam_id = $2, roll_no = $3, registration_no = $4, \
             student_name = $5, dob = $6, mobile = $7, marks = $8, status_text = $9, \
             result_status = $10 WHERE id = $1 RETURNING {}",
            RESULT_COLUMNS
        );
        let record = sqlx::query_as::<_, ResultRecord>(&sql)
            .bind(id)
            .bind(result.exam_id)
            .bind(&result.roll_no)
            .bind(&result.registration_no)
            .bind(&result.student_name)
            .bind(&result.dob)
            .bind(&result.mobile)
            .bind(result.marks)
            .bind(&result.status_text)
            .bind(&result.result_status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_err(e, || format!("Result {}", id)))?;
        Ok(record.to_domain())
    }

    async fn soft_delete_result(&self, id: Uuid) -> PortResult<()> {
        self.deactivate("results", "Result", id).await
    }

    async fn search_results(&self, query: &ResultQuery) -> PortResult<Vec<ExamResult>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM results WHERE status = 'active' AND (roll_no = ",
            RESULT_COLUMNS
        ));
        builder
            .push_bind(&query.identifier)
            .push(" OR registration_no = ")
            .push_bind(&query.identifier)
            .push(")");
        if query.published_only {
            builder
                .push(" AND result_status = ")
                .push_bind(results_portal_core::domain::PUBLISHED);
        }
        if let Some(exam_ids) = &query.exam_ids {
            builder.push(" AND exam_id = ANY(").push_bind(exam_ids).push(")");
        }
        if let Some(dob) = &query.dob {
            builder.push(" AND dob = ").push_bind(dob);
        }
        if let Some(mobile) = &query.mobile {
            builder.push(" AND mobile = ").push_bind(mobile);
        }
        builder.push(" ORDER BY created_at DESC");

        let records = builder
            .build_query_as::<ResultRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

impl PgStore {
    /// Soft delete: flips `status` and keeps the row.
    async fn deactivate(&self, table: &'static str, kind: &str, id: Uuid) -> PortResult<()> {
        let sql = format!("UPDATE {} SET status = 'inactive' WHERE id = $1", table);
        let done = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if done.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("{} {} not found", kind, id)));
        }
        Ok(())
    }
}
