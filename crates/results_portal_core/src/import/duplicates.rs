//! Detection of repeated `(exam, roll_no)` pairs, in-file and against the store.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::ports::{PortResult, ResultStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    /// An earlier row of the same upload used this pair.
    InFile,
    /// An active stored result already uses this pair.
    InStore,
}

impl DuplicateKind {
    pub fn message(&self) -> &'static str {
        match self {
            DuplicateKind::InFile => "Duplicate roll_no in file",
            DuplicateKind::InStore => "Duplicate roll_no for exam",
        }
    }
}

/// Per-run memory of the pairs seen so far. Rows must be checked in file order.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    seen: HashSet<(Uuid, String)>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The in-file check runs first and needs no I/O; the store is only
    /// queried for pairs new to this file. A pair is remembered even when the
    /// store reports it as taken, so a later repeat is flagged as in-file.
    pub async fn check(
        &mut self,
        store: &dyn ResultStore,
        exam_id: Uuid,
        roll_no: &str,
    ) -> PortResult<Option<DuplicateKind>> {
        if !self.seen.insert((exam_id, roll_no.to_string())) {
            return Ok(Some(DuplicateKind::InFile));
        }
        match store.find_active_result(exam_id, roll_no).await? {
            Some(_) => Ok(Some(DuplicateKind::InStore)),
            None => Ok(None),
        }
    }
}
