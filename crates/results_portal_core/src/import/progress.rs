//! Progress events emitted while an import runs.
//!
//! The importer pushes events onto an unbounded channel; whoever holds the
//! `ProgressStream` may read them as an async sequence or drop it. Rows are
//! processed one at a time, so the channel never needs backpressure.

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    /// Row processing is about to begin.
    Started { total: usize },
    /// Emitted after each row, accepted or not.
    RowProcessed { processed: usize, total: usize },
    /// A batch insert failed; its rows were not stored.
    BatchFailed {
        batch: usize,
        rows: usize,
        message: String,
    },
    Finished { inserted: usize, errors: usize },
}

pub type ProgressStream = UnboundedReceiver<ImportEvent>;

/// Sending half handed to the importer. Sending never fails the import.
#[derive(Debug, Clone, Default)]
pub struct ProgressSender {
    tx: Option<UnboundedSender<ImportEvent>>,
}

impl ProgressSender {
    /// A sender that discards every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: ImportEvent) {
        if let Some(tx) = &self.tx {
            // A closed receiver just means nobody is watching any more.
            let _ = tx.unbounded_send(event);
        }
    }
}

pub fn progress_channel() -> (ProgressSender, ProgressStream) {
    let (tx, rx) = mpsc::unbounded();
    (ProgressSender { tx: Some(tx) }, rx)
}
