//! End-to-end runs of the import pipeline against the in-memory store.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::StreamExt;
use results_portal_core::import::{
    progress_channel, ErrorKind, ImportEvent, ImportOptions, ImportOutcome, Importer,
    ProgressSender, RawSheet, ValidationPolicy, REQUIRED_COLUMNS,
};
use results_portal_core::{MemoryStore, RecordStatus};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

fn row(roll_no: &str, student_name: &str) -> Vec<String> {
    [
        "GK 2026",
        "2026-02-08",
        "2026",
        "Class 5",
        roll_no,
        "",
        student_name,
        "2014-05-01",
        "9876543210",
        "78",
        "",
        "",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn sheet(rows: Vec<Vec<String>>) -> RawSheet {
    let mut grid = vec![REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect()];
    grid.extend(rows);
    RawSheet::from_grid(grid)
}

fn five_students() -> RawSheet {
    sheet(
        ["501", "502", "503", "504", "505"]
            .iter()
            .map(|roll| row(roll, "Student"))
            .collect(),
    )
}

fn importer(store: &Arc<MemoryStore>, options: ImportOptions) -> Importer {
    Importer::new(store.clone(), options)
}

#[tokio::test]
async fn fresh_upload_creates_entities_once_and_inserts_every_row() {
    let store = Arc::new(MemoryStore::new());
    let report = importer(&store, ImportOptions::default())
        .run_as_of(five_students(), ProgressSender::disabled(), today())
        .await;

    assert_eq!(report.outcome, ImportOutcome::FullSuccess);
    assert_eq!(report.inserted, 5);
    assert!(report.errors.is_empty());
    assert_eq!(
        (report.created.sessions, report.created.classes, report.created.exams),
        (1, 1, 1)
    );

    let calls = store.calls();
    assert_eq!(calls.session_lookups, 1);
    assert_eq!(calls.class_lookups, 1);
    assert_eq!(calls.exam_lookups, 1);
    assert_eq!(calls.batch_inserts, 1);

    let exam = &store.exams()[0];
    assert!(exam.is_upcoming);
    let results = store.results();
    assert!(results.iter().all(|r| r.exam_id == exam.id));
    assert!(results
        .iter()
        .all(|r| r.status_text == "pass" && r.result_status == "published"));
    assert!(results.iter().all(|r| r.status == RecordStatus::Active));
}

#[tokio::test]
async fn reupload_reports_every_row_as_stored_duplicate() {
    let store = Arc::new(MemoryStore::new());
    let importer = importer(&store, ImportOptions::default());
    importer
        .run_as_of(five_students(), ProgressSender::disabled(), today())
        .await;

    let report = importer
        .run_as_of(five_students(), ProgressSender::disabled(), today())
        .await;

    assert_eq!(report.outcome, ImportOutcome::PartialSuccess);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.errors.len(), 5);
    assert!(report
        .errors
        .iter()
        .all(|e| e.kind == ErrorKind::Duplicate && e.message == "Duplicate roll_no for exam"));
    assert_eq!(
        (report.created.sessions, report.created.classes, report.created.exams),
        (0, 0, 0)
    );
    assert_eq!(store.results().len(), 5);
}

#[tokio::test]
async fn missing_column_rejects_without_touching_the_store() {
    let store = Arc::new(MemoryStore::new());
    let headers: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| **c != "mobile")
        .map(|c| c.to_string())
        .collect();
    let sheet = RawSheet::from_grid(vec![headers, vec!["GK".to_string()]]);

    let report = importer(&store, ImportOptions::default())
        .run_as_of(sheet, ProgressSender::disabled(), today())
        .await;

    assert_eq!(report.outcome, ImportOutcome::MissingColumns);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].to_string(), "Missing columns: mobile");
    assert_eq!(report.inserted, 0);
    assert_eq!(store.calls(), Default::default());
}

#[tokio::test]
async fn one_invalid_row_aborts_the_whole_file() {
    let store = Arc::new(MemoryStore::new());
    let sheet = sheet(vec![
        row("501", "Asha"),
        row("502", "Binod"),
        row("503", ""),
        row("504", "Chitra"),
    ]);

    let report = importer(&store, ImportOptions::default())
        .run_as_of(sheet, ProgressSender::disabled(), today())
        .await;

    assert_eq!(report.outcome, ImportOutcome::InvalidRows);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        report.errors[0].to_string(),
        "Row 3: roll_no & student_name required"
    );
    assert!(store.results().is_empty());
    assert!(store.sessions().is_empty());
}

#[tokio::test]
async fn skip_policy_imports_the_valid_rows() {
    let store = Arc::new(MemoryStore::new());
    let mut bad_marks = row("504", "Chitra");
    bad_marks[9] = "absent".to_string();
    let sheet = sheet(vec![
        row("501", "Asha"),
        row("502", "Binod"),
        row("503", ""),
        bad_marks,
    ]);
    let options = ImportOptions {
        validation_policy: ValidationPolicy::SkipInvalidRows,
        ..Default::default()
    };

    let report = importer(&store, options)
        .run_as_of(sheet, ProgressSender::disabled(), today())
        .await;

    assert_eq!(report.outcome, ImportOutcome::PartialSuccess);
    assert_eq!(report.inserted, 2);
    let messages: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        messages,
        vec![
            "Row 3: roll_no & student_name required",
            "Row 4: marks must be a number",
        ]
    );
}

#[tokio::test]
async fn failed_middle_batch_keeps_the_others() {
    let store = Arc::new(MemoryStore::new());
    store.fail_batch(2);
    let options = ImportOptions {
        batch_size: 2,
        ..Default::default()
    };

    let (tx, rx) = progress_channel();
    let report = importer(&store, options)
        .run_as_of(five_students(), tx, today())
        .await;

    assert_eq!(report.outcome, ImportOutcome::PartialSuccess);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::Storage);
    assert_eq!(report.errors[0].row_label(), "-");
    assert!(report.errors[0].message.starts_with("Batch 2 failed"));

    let mut stored: Vec<String> = store.results().into_iter().map(|r| r.roll_no).collect();
    stored.sort();
    assert_eq!(stored, vec!["501", "502", "505"]);

    let events: Vec<ImportEvent> = rx.collect().await;
    assert!(events
        .iter()
        .any(|e| matches!(e, ImportEvent::BatchFailed { batch: 2, rows: 2, .. })));
}

#[tokio::test]
async fn repeated_roll_number_in_file_is_rejected_once() {
    let store = Arc::new(MemoryStore::new());
    let sheet = sheet(vec![
        row("501", "Asha"),
        row("502", "Binod"),
        row("501", "Asha again"),
    ]);

    let report = importer(&store, ImportOptions::default())
        .run_as_of(sheet, ProgressSender::disabled(), today())
        .await;

    assert_eq!(report.inserted, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        report.errors[0].to_string(),
        "Row 3: Duplicate roll_no in file"
    );
    // The in-file hit is answered without asking the store.
    assert_eq!(store.calls().result_lookups, 2);
}

#[tokio::test]
async fn exam_insert_failure_becomes_a_row_error() {
    let store = Arc::new(MemoryStore::new());
    store.fail_exam_inserts();

    let report = importer(&store, ImportOptions::default())
        .run_as_of(five_students(), ProgressSender::disabled(), today())
        .await;

    assert_eq!(report.outcome, ImportOutcome::PartialSuccess);
    assert_eq!(report.inserted, 0);
    assert_eq!(report.errors.len(), 5);
    assert!(report.errors.iter().all(|e| e.kind == ErrorKind::Resolution
        && e.message.starts_with("Missing exam or roll number")));
    assert!(store.results().is_empty());
}

#[tokio::test]
async fn progress_reports_every_row_then_finishes() {
    let store = Arc::new(MemoryStore::new());
    let (tx, rx) = progress_channel();

    importer(&store, ImportOptions::default())
        .run_as_of(five_students(), tx, today())
        .await;
    let events: Vec<ImportEvent> = rx.collect().await;

    assert_eq!(events.first(), Some(&ImportEvent::Started { total: 5 }));
    let processed: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ImportEvent::RowProcessed { processed, .. } => Some(*processed),
            _ => None,
        })
        .collect();
    assert_eq!(processed, vec![1, 2, 3, 4, 5]);
    assert_eq!(
        events.last(),
        Some(&ImportEvent::Finished {
            inserted: 5,
            errors: 0
        })
    );
}
