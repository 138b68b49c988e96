pub mod admin;
pub mod domain;
pub mod import;
pub mod lookup;
pub mod memory;
pub mod ports;

pub use domain::{Class, Exam, ExamResult, NewResult, RecordStatus, Session};
pub use import::{ImportOptions, ImportOutcome, ImportReport, Importer, ValidationPolicy};
pub use memory::MemoryStore;
pub use ports::{PortError, PortResult, ResultStore};
