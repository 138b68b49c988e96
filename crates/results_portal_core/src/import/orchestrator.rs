//! Drives one import run from a parsed sheet to a final report.
//!
//! Per row: pending -> resolving entities -> duplicate check -> staged or
//! rejected. Staged rows are written in fixed-size batches once every row has
//! been seen. A failed batch is reported and skipped; earlier batches stay.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::duplicates::DuplicateDetector;
use super::progress::{ImportEvent, ProgressSender};
use super::report::{ErrorKind, ImportOutcome, ImportReport, RowError};
use super::resolver::EntityResolver;
use super::sheet::{ImportRow, RawSheet};
use super::validator::{check_columns, validate_rows};
use super::DEFAULT_BATCH_SIZE;
use crate::domain::{NewResult, DEFAULT_RESULT_STATUS, DEFAULT_STATUS_TEXT};
use crate::ports::{PortError, ResultStore};

const MISSING_EXAM_OR_ROLL: &str = "Missing exam or roll number";

/// What to do when the up-front row validation finds problems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Any invalid row aborts the whole import before anything is written.
    #[default]
    AbortOnAnyError,
    /// Invalid rows are reported and skipped like duplicates.
    SkipInvalidRows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub validation_policy: ValidationPolicy,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            validation_policy: ValidationPolicy::default(),
        }
    }
}

#[derive(Clone)]
pub struct Importer {
    store: Arc<dyn ResultStore>,
    options: ImportOptions,
}

impl Importer {
    pub fn new(store: Arc<dyn ResultStore>, options: ImportOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> ImportOptions {
        self.options
    }

    /// Runs an import, deriving `is_upcoming` for new exams from today's date.
    pub async fn run(&self, sheet: RawSheet, progress: ProgressSender) -> ImportReport {
        self.run_as_of(sheet, progress, Utc::now().date_naive()).await
    }

    pub async fn run_as_of(
        &self,
        sheet: RawSheet,
        progress: ProgressSender,
        today: NaiveDate,
    ) -> ImportReport {
        let total = sheet.rows.len();

        if let Some(error) = check_columns(&sheet) {
            warn!("Import rejected: {}", error.message);
            return self.finish(
                ImportReport::rejected(ImportOutcome::MissingColumns, total, vec![error]),
                &progress,
            );
        }

        let validated = validate_rows(&sheet.rows);
        let mut errors = validated.errors;
        if !errors.is_empty() && self.options.validation_policy == ValidationPolicy::AbortOnAnyError
        {
            warn!(
                "Import aborted: {} row validation error(s) in {} rows",
                errors.len(),
                total
            );
            return self.finish(
                ImportReport::rejected(ImportOutcome::InvalidRows, total, errors),
                &progress,
            );
        }

        info!("Importing {} rows", total);
        progress.emit(ImportEvent::Started { total });

        let store = self.store.as_ref();
        let mut resolver = EntityResolver::new(store, today);
        let mut detector = DuplicateDetector::new();
        let mut staged: Vec<NewResult> = Vec::new();

        for (index, row) in validated.rows.into_iter().enumerate() {
            if let Some(row) = row {
                match stage_row(&mut resolver, &mut detector, store, row, index + 1).await {
                    Ok(result) => staged.push(result),
                    Err(error) => {
                        debug!("{}", error);
                        errors.push(error);
                    }
                }
            }
            progress.emit(ImportEvent::RowProcessed {
                processed: index + 1,
                total,
            });
        }

        let inserted = self.insert_batches(staged, &mut errors, &progress).await;

        let outcome = if errors.is_empty() {
            ImportOutcome::FullSuccess
        } else {
            ImportOutcome::PartialSuccess
        };
        let report = ImportReport {
            outcome,
            total_rows: total,
            inserted,
            created: resolver.created(),
            errors,
        };
        info!(
            "Import finished: {} of {} rows inserted, {} errors",
            report.inserted,
            report.total_rows,
            report.errors.len()
        );
        self.finish(report, &progress)
    }

    async fn insert_batches(
        &self,
        staged: Vec<NewResult>,
        errors: &mut Vec<RowError>,
        progress: &ProgressSender,
    ) -> usize {
        let batch_size = self.options.batch_size.max(1);
        let mut inserted = 0;
        for (batch_index, chunk) in staged.chunks(batch_size).enumerate() {
            let batch = batch_index + 1;
            match self.store.insert_results(chunk.to_vec()).await {
                Ok(count) => {
                    debug!("Batch {} stored {} results", batch, count);
                    inserted += count;
                }
                Err(e) => {
                    warn!("Batch {} of {} rows failed: {}", batch, chunk.len(), e);
                    let message = format!("Batch {} failed: {}", batch, e);
                    progress.emit(ImportEvent::BatchFailed {
                        batch,
                        rows: chunk.len(),
                        message: message.clone(),
                    });
                    errors.push(RowError::unplaced(ErrorKind::Storage, message));
                }
            }
        }
        inserted
    }

    fn finish(&self, report: ImportReport, progress: &ProgressSender) -> ImportReport {
        progress.emit(ImportEvent::Finished {
            inserted: report.inserted,
            errors: report.errors.len(),
        });
        report
    }
}

/// Resolves, de-duplicates and projects one valid row. `line` is 1-based.
async fn stage_row(
    resolver: &mut EntityResolver<'_>,
    detector: &mut DuplicateDetector,
    store: &dyn ResultStore,
    row: ImportRow,
    line: usize,
) -> Result<NewResult, RowError> {
    let exam_id = resolve_exam_for(resolver, &row).await.map_err(|e| {
        RowError::at_row(
            line,
            ErrorKind::Resolution,
            format!("{} ({})", MISSING_EXAM_OR_ROLL, e),
        )
    })?;

    let exam_id = match exam_id {
        Some(id) if !row.roll_no.is_empty() => id,
        _ => {
            return Err(RowError::at_row(
                line,
                ErrorKind::Resolution,
                MISSING_EXAM_OR_ROLL,
            ))
        }
    };

    match detector.check(store, exam_id, &row.roll_no).await {
        Ok(None) => {}
        Ok(Some(kind)) => {
            return Err(RowError::at_row(line, ErrorKind::Duplicate, kind.message()));
        }
        Err(e) => {
            return Err(RowError::at_row(
                line,
                ErrorKind::Storage,
                format!("Could not check for duplicates: {}", e),
            ));
        }
    }

    Ok(NewResult {
        exam_id,
        roll_no: row.roll_no,
        registration_no: row.registration_no,
        student_name: row.student_name,
        dob: row.dob,
        mobile: row.mobile,
        marks: row.marks,
        status_text: row
            .status_text
            .unwrap_or_else(|| DEFAULT_STATUS_TEXT.to_string()),
        result_status: row
            .result_status
            .unwrap_or_else(|| DEFAULT_RESULT_STATUS.to_string()),
    })
}

/// Session, then class, then exam: each step needs the previous id.
async fn resolve_exam_for(
    resolver: &mut EntityResolver<'_>,
    row: &ImportRow,
) -> Result<Option<Uuid>, PortError> {
    let session_id = resolver.resolve_session(&row.session).await?;
    let class_id = resolver.resolve_class(&row.class_name, session_id).await?;
    resolver
        .resolve_exam(&row.exam_name, &row.exam_date, class_id, session_id)
        .await
}
