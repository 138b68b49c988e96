//! services/api/src/web/jobs.rs
//!
//! Tracks import runs started over HTTP. Each run executes on its own task;
//! its progress events are folded into a `JobStatus` that pollers read and
//! WebSocket subscribers watch.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use results_portal_core::import::{
    progress_channel, ImportEvent, ImportReport, Importer, RawSheet,
};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Finished jobs older than this are dropped when a new job registers.
const FINISHED_JOB_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Finished,
}

/// Everything a client needs to render an import's progress.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobStatus {
    pub import_id: Uuid,
    pub file_name: String,
    pub state: JobState,
    pub processed: usize,
    pub total_rows: usize,
    pub inserted: usize,
    pub error_count: usize,
    pub summary: Option<String>,
    #[schema(value_type = Object)]
    pub report: Option<ImportReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    fn new(import_id: Uuid, file_name: String, total_rows: usize) -> Self {
        Self {
            import_id,
            file_name,
            state: JobState::Running,
            processed: 0,
            total_rows,
            inserted: 0,
            error_count: 0,
            summary: None,
            report: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Folds one progress event into the running counters.
    fn apply(&mut self, event: &ImportEvent) {
        match event {
            ImportEvent::Started { total } => self.total_rows = *total,
            ImportEvent::RowProcessed { processed, total } => {
                self.processed = *processed;
                self.total_rows = *total;
            }
            ImportEvent::BatchFailed { .. } => self.error_count += 1,
            ImportEvent::Finished { inserted, errors } => {
                self.inserted = *inserted;
                self.error_count = *errors;
            }
        }
    }

    fn complete(&mut self, report: ImportReport) {
        self.state = JobState::Finished;
        // A rejected upload never got past the header or field checks.
        if !report.outcome.is_rejected() {
            self.processed = self.processed.max(report.total_rows);
        }
        self.inserted = report.inserted;
        self.error_count = report.errors.len();
        self.summary = Some(report.summary());
        self.report = Some(report);
        self.finished_at = Some(Utc::now());
    }
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, watch::Sender<JobStatus>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a job and runs the import on a background task.
    pub async fn spawn_import(
        &self,
        importer: Importer,
        sheet: RawSheet,
        file_name: String,
    ) -> Uuid {
        let import_id = Uuid::new_v4();
        let total_rows = sheet.rows.len();
        let (status_tx, _) =
            watch::channel(JobStatus::new(import_id, file_name.clone(), total_rows));
        {
            let mut jobs = self.jobs.write().await;
            prune_finished(&mut jobs, Utc::now());
            jobs.insert(import_id, status_tx.clone());
        }
        info!(
            "Import {} started for '{}' ({} rows)",
            import_id, file_name, total_rows
        );

        tokio::spawn(async move {
            let (progress, mut events) = progress_channel();
            let forward = async {
                while let Some(event) = events.next().await {
                    status_tx.send_modify(|status| status.apply(&event));
                }
            };
            let (report, ()) = tokio::join!(importer.run(sheet, progress), forward);

            if report.has_errors() {
                warn!("Import {} finished: {}", import_id, report.summary());
            } else {
                info!("Import {} finished: {}", import_id, report.summary());
            }
            status_tx.send_modify(|status| status.complete(report));
        });

        import_id
    }

    pub async fn status(&self, import_id: Uuid) -> Option<JobStatus> {
        let jobs = self.jobs.read().await;
        jobs.get(&import_id).map(|tx| tx.borrow().clone())
    }

    /// A receiver that sees the current status and every later change.
    pub async fn subscribe(&self, import_id: Uuid) -> Option<watch::Receiver<JobStatus>> {
        let jobs = self.jobs.read().await;
        jobs.get(&import_id).map(|tx| tx.subscribe())
    }
}

fn prune_finished(jobs: &mut HashMap<Uuid, watch::Sender<JobStatus>>, now: DateTime<Utc>) {
    let cutoff = now - Duration::minutes(FINISHED_JOB_TTL_MINUTES);
    jobs.retain(|_, tx| match tx.borrow().finished_at {
        Some(finished_at) => finished_at > cutoff,
        None => true,
    });
}
