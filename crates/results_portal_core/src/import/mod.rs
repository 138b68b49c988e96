//! crates/results_portal_core/src/import/mod.rs
//!
//! The bulk import pipeline: a spreadsheet of results goes in, resolved and
//! de-duplicated `results` rows come out, together with a per-row error report.
//!
//! Rows are handled strictly in file order. Later rows depend on earlier ones
//! both for in-file duplicate detection and for the entity resolver cache.

pub mod duplicates;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod resolver;
pub mod sheet;
pub mod validator;

pub use duplicates::{DuplicateDetector, DuplicateKind};
pub use orchestrator::{ImportOptions, Importer, ValidationPolicy};
pub use progress::{progress_channel, ImportEvent, ProgressSender, ProgressStream};
pub use report::{ErrorKind, ImportOutcome, ImportReport, RowError};
pub use resolver::{CreatedEntities, EntityResolver};
pub use sheet::{ImportRow, RawRow, RawSheet};

/// Header columns every upload must carry, in template order.
pub const REQUIRED_COLUMNS: [&str; 12] = [
    "exam_name",
    "exam_date",
    "session",
    "class_name",
    "roll_no",
    "registration_no",
    "student_name",
    "dob",
    "mobile",
    "marks",
    "status_text",
    "result_status",
];

/// Number of staged results written per store round-trip.
pub const DEFAULT_BATCH_SIZE: usize = 50;
