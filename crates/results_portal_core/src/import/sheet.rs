//! Loosely typed spreadsheet rows and their typed projection.
//!
//! Adapters turn an uploaded file into a `RawSheet` of string cells. The
//! pipeline then coerces each `RawRow` into an `ImportRow` with explicit
//! optional fields, so a bad `marks` cell surfaces as a validation error
//! instead of travelling on as a meaningless value.

use std::collections::HashMap;

use super::REQUIRED_COLUMNS;

/// The first sheet of an upload: a header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawSheet {
    /// Builds a sheet from a grid of cells whose first row is the header.
    ///
    /// Rows where every cell is blank are dropped, which is what spreadsheet
    /// tools do for trailing formatting-only rows.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Self {
        let mut lines = grid.into_iter();
        let headers: Vec<String> = match lines.next() {
            Some(header) => header.into_iter().map(|h| h.trim().to_string()).collect(),
            None => return Self::default(),
        };

        let rows = lines
            .filter(|cells| cells.iter().any(|c| !c.trim().is_empty()))
            .map(|cells| {
                let pairs = headers
                    .iter()
                    .zip(cells)
                    .filter(|(h, _)| !h.is_empty())
                    .map(|(h, c)| (h.clone(), c));
                RawRow::from_pairs(pairs)
            })
            .collect();

        Self { headers, rows }
    }

    /// Required columns absent from the header row, in template order.
    pub fn missing_columns(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !self.headers.iter().any(|h| h == col))
            .collect()
    }
}

/// One data row keyed by column name. Missing cells read as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: HashMap<String, String>,
}

impl RawRow {
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The trimmed cell value, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(|v| v.trim()).unwrap_or("")
    }

    fn optional(&self, column: &str) -> Option<String> {
        let value = self.get(column);
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// A coercion failure for a single cell.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{column} must be a number")]
pub struct CoercionError {
    pub column: &'static str,
}

/// The typed projection of one uploaded row. Never persisted directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub exam_name: String,
    pub exam_date: String,
    pub session: String,
    pub class_name: String,
    pub roll_no: String,
    pub registration_no: Option<String>,
    pub student_name: String,
    pub dob: Option<String>,
    pub mobile: Option<String>,
    pub marks: Option<f64>,
    pub status_text: Option<String>,
    pub result_status: Option<String>,
}

impl ImportRow {
    pub fn from_raw(raw: &RawRow) -> Result<Self, CoercionError> {
        let marks = match raw.get("marks") {
            "" => None,
            value => Some(
                value
                    .parse::<f64>()
                    .ok()
                    .filter(|m| m.is_finite())
                    .ok_or(CoercionError { column: "marks" })?,
            ),
        };

        Ok(Self {
            exam_name: raw.get("exam_name").to_string(),
            exam_date: raw.get("exam_date").to_string(),
            session: raw.get("session").to_string(),
            class_name: raw.get("class_name").to_string(),
            roll_no: raw.get("roll_no").to_string(),
            registration_no: raw.optional("registration_no"),
            student_name: raw.get("student_name").to_string(),
            dob: raw.optional("dob"),
            mobile: raw.optional("mobile"),
            marks,
            status_text: raw.optional("status_text"),
            result_status: raw.optional("result_status"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_row_is_trimmed_and_blank_rows_dropped() {
        let sheet = RawSheet::from_grid(grid(&[
            &[" roll_no ", "student_name"],
            &["501", "Amit Kumar"],
            &["", "  "],
            &["502"],
        ]));

        assert_eq!(sheet.headers, vec!["roll_no", "student_name"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].get("student_name"), "Amit Kumar");
        assert_eq!(sheet.rows[1].get("student_name"), "");
    }

    #[test]
    fn reports_every_missing_column() {
        let mut headers: Vec<&str> = REQUIRED_COLUMNS.to_vec();
        headers.retain(|h| *h != "mobile" && *h != "dob");
        let sheet = RawSheet::from_grid(grid(&[&headers]));

        assert_eq!(sheet.missing_columns(), vec!["dob", "mobile"]);
    }

    #[test]
    fn non_numeric_marks_fail_coercion() {
        let raw = RawRow::from_pairs([("marks", "seventy")]);
        assert_eq!(
            ImportRow::from_raw(&raw).unwrap_err(),
            CoercionError { column: "marks" }
        );

        let raw = RawRow::from_pairs([("marks", " 78.5 "), ("dob", " ")]);
        let row = ImportRow::from_raw(&raw).unwrap();
        assert_eq!(row.marks, Some(78.5));
        assert_eq!(row.dob, None);
    }
}
