//! The outcome of one import run and its error entries.

use std::fmt;

use serde::Serialize;

use super::resolver::CreatedEntities;

/// Which gate or stage produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required columns missing from the header. Fatal.
    Structural,
    /// Missing required field or uncoercible cell.
    Validation,
    /// Exam could not be resolved, or roll number empty.
    Resolution,
    /// Same `(exam, roll_no)` seen earlier in the file or already stored.
    Duplicate,
    /// A store call failed while checking or inserting.
    Storage,
}

/// One line of the error report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// 1-based data row number; `None` for file- and batch-level entries.
    pub row: Option<usize>,
    pub kind: ErrorKind,
    pub message: String,
}

impl RowError {
    pub fn at_row(row: usize, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            row: Some(row),
            kind,
            message: message.into(),
        }
    }

    pub fn unplaced(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            row: None,
            kind,
            message: message.into(),
        }
    }

    /// The `row` column of the downloadable report: a number or `-`.
    pub fn row_label(&self) -> String {
        self.row
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.row) {
            (ErrorKind::Structural, _) => f.write_str(&self.message),
            _ => write!(f, "Row {}: {}", self.row_label(), self.message),
        }
    }
}

/// Terminal state of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    /// Rejected before any row was processed.
    MissingColumns,
    /// Rejected by the up-front required-field gate; nothing inserted.
    InvalidRows,
    /// Every row processed, some of them rejected or failed.
    PartialSuccess,
    FullSuccess,
}

impl ImportOutcome {
    /// True when the run stopped before touching the store.
    pub fn is_rejected(&self) -> bool {
        matches!(self, ImportOutcome::MissingColumns | ImportOutcome::InvalidRows)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub outcome: ImportOutcome,
    pub total_rows: usize,
    pub inserted: usize,
    pub created: CreatedEntities,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub(crate) fn rejected(
        outcome: ImportOutcome,
        total_rows: usize,
        errors: Vec<RowError>,
    ) -> Self {
        Self {
            outcome,
            total_rows,
            inserted: 0,
            created: CreatedEntities::default(),
            errors,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// A one-line status message for the uploader.
    pub fn summary(&self) -> String {
        match self.outcome {
            ImportOutcome::MissingColumns => self
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "Missing columns".to_string()),
            ImportOutcome::InvalidRows => format!(
                "Import aborted: {} row error(s) found, nothing was imported.",
                self.errors.len()
            ),
            ImportOutcome::PartialSuccess => format!(
                "Imported {} of {} rows with {} errors.",
                self.inserted,
                self.total_rows,
                self.errors.len()
            ),
            ImportOutcome::FullSuccess => {
                format!("Imported {} rows successfully.", self.inserted)
            }
        }
    }
}
