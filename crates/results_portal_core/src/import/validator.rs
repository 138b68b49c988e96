//! Structural and per-row checks that run before anything touches the store.

use super::report::{ErrorKind, RowError};
use super::sheet::{ImportRow, RawRow, RawSheet};

/// Rejects a sheet whose header lacks any required column.
pub fn check_columns(sheet: &RawSheet) -> Option<RowError> {
    let missing = sheet.missing_columns();
    if missing.is_empty() {
        return None;
    }
    Some(RowError::unplaced(
        ErrorKind::Structural,
        format!("Missing columns: {}", missing.join(", ")),
    ))
}

/// Required-field checks for one row; `index` is 0-based.
///
/// Produces one message per missing group. Formats and enum values are not
/// checked here.
pub fn validate_row(row: &ImportRow, index: usize) -> Vec<RowError> {
    let line = index + 1;
    let mut errors = Vec::new();
    if row.roll_no.is_empty() || row.student_name.is_empty() {
        errors.push(RowError::at_row(
            line,
            ErrorKind::Validation,
            "roll_no & student_name required",
        ));
    }
    if row.exam_name.is_empty() || row.class_name.is_empty() {
        errors.push(RowError::at_row(
            line,
            ErrorKind::Validation,
            "exam_name & class_name required",
        ));
    }
    errors
}

/// Coerced rows aligned with the input (`None` where the row failed) plus
/// every error found.
#[derive(Debug, Default)]
pub struct ValidatedRows {
    pub rows: Vec<Option<ImportRow>>,
    pub errors: Vec<RowError>,
}

pub fn validate_rows(raw_rows: &[RawRow]) -> ValidatedRows {
    let mut validated = ValidatedRows::default();
    for (index, raw) in raw_rows.iter().enumerate() {
        let row = match ImportRow::from_raw(raw) {
            Ok(row) => row,
            Err(e) => {
                validated.errors.push(RowError::at_row(
                    index + 1,
                    ErrorKind::Validation,
                    e.to_string(),
                ));
                validated.rows.push(None);
                continue;
            }
        };

        let errors = validate_row(&row, index);
        if errors.is_empty() {
            validated.rows.push(Some(row));
        } else {
            validated.errors.extend(errors);
            validated.rows.push(None);
        }
    }
    validated
}
