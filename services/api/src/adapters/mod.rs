pub mod db;
pub mod spreadsheet;

pub use db::PgStore;
pub use spreadsheet::{read_sheet, write_error_report, write_sample_template, SheetError};
