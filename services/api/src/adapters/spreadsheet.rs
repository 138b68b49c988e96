//! services/api/src/adapters/spreadsheet.rs
//!
//! Turns uploaded workbooks and CSV files into the core's `RawSheet`, and
//! writes the downloadable error report and sample template.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};
use results_portal_core::import::{RawSheet, RowError, REQUIRED_COLUMNS};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::debug;

/// Name of the worksheet in the downloadable error report.
pub const ERRORS_SHEET: &str = "Errors";

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("Unsupported file type '{0}'. Upload .xlsx, .xls, .ods or .csv")]
    UnsupportedFormat(String),
    #[error("Could not read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("The workbook has no sheets")]
    NoSheets,
    #[error("Could not write workbook: {0}")]
    Write(#[from] XlsxError),
}

//=========================================================================================
// Reading Uploads
//=========================================================================================

/// Parses the first sheet of an upload. The format is chosen by extension.
pub fn read_sheet(file_name: &str, bytes: &[u8]) -> Result<RawSheet, SheetError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let grid = match extension.as_str() {
        "csv" => read_csv(bytes)?,
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(bytes)?,
        _ => return Err(SheetError::UnsupportedFormat(file_name.to_string())),
    };
    let sheet = RawSheet::from_grid(grid);
    debug!(
        "Parsed '{}': {} columns, {} data rows",
        file_name,
        sheet.headers.len(),
        sheet.rows.len()
    );
    Ok(sheet)
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<String>>, SheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::NoSheets)??;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(|c| c.to_string()).collect::<Vec<_>>());
    }
    // Spreadsheet tools often prefix CSV exports with a byte-order mark.
    if let Some(first) = grid.first_mut().and_then(|row| row.first_mut()) {
        *first = first.trim_start_matches('\u{feff}').to_string();
    }
    Ok(grid)
}

/// Renders a cell the way a person reading the sheet would type it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Integers without decimals: roll numbers often arrive as floats.
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Data::Float(n) => n.to_string(),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) => s.get(..10).unwrap_or(s.as_str()).to_string(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Converts a 1900-system Excel serial to a calendar date, dropping the time.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Day zero is 1899-12-30, which absorbs Excel's phantom 1900-02-29.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

//=========================================================================================
// Writing Reports
//=========================================================================================

/// Builds the `Errors` workbook offered for download after an import.
///
/// Column `row` holds the data row number, or `-` for errors that are not
/// tied to a row.
pub fn write_error_report(errors: &[RowError]) -> Result<Vec<u8>, SheetError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(ERRORS_SHEET)?;
    sheet.write_string_with_format(0, 0, "row", &bold)?;
    sheet.write_string_with_format(0, 1, "error", &bold)?;

    for (index, error) in errors.iter().enumerate() {
        let line = index as u32 + 1;
        match error.row {
            Some(row) => sheet.write_number(line, 0, row as f64)?,
            None => sheet.write_string(line, 0, "-")?,
        };
        sheet.write_string(line, 1, &error.message)?;
    }
    sheet.set_column_width(1, 60)?;

    Ok(workbook.save_to_buffer()?)
}

const SAMPLE_ROWS: [[&str; 12]; 2] = [
    [
        "GK Olympiad", "2026-02-08", "2025-26", "Class 5", "501", "REG-501", "Amit Kumar",
        "2014-05-01", "9876543210", "78", "pass", "published",
    ],
    [
        "GK Olympiad", "2026-02-08", "2025-26", "Class 5", "502", "REG-502", "Priya Sharma",
        "2014-08-17", "9876500000", "91", "pass", "published",
    ],
];

/// The blank upload template: required headers plus two example rows.
pub fn write_sample_template() -> Result<Vec<u8>, SheetError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Results")?;

    for (col, header) in REQUIRED_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (row, values) in SAMPLE_ROWS.iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            sheet.write_string(row as u32 + 1, col as u16, *value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}
