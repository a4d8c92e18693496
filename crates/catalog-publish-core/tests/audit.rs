// crates/catalog-publish-core/tests/audit.rs
// ============================================================================
// Module: Publish Audit Tests
// Description: JSON-line serialization and the file sink.
// Purpose: Ensure audit events are machine-readable and append-only.
// Dependencies: catalog-publish-core, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Writes events through the file sink and parses them back as JSON lines.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use catalog_publish_core::CatalogId;
use catalog_publish_core::CatalogRecordUpdate;
use catalog_publish_core::CatalogRunSummary;
use catalog_publish_core::Decision;
use catalog_publish_core::FileAuditSink;
use catalog_publish_core::PublishAuditEvent;
use catalog_publish_core::PublishAuditSink;
use catalog_publish_core::RecordId;
use catalog_publish_core::RegistryError;
use catalog_publish_core::SyncRecord;
use catalog_publish_core::Timestamp;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

/// Verifies events append as one JSON object per line with optional fields omitted.
#[test]
fn file_sink_appends_json_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.jsonl");
    let catalog_id = CatalogId::new("SAEON");

    let sink = FileAuditSink::new(&path).unwrap();
    sink.record(&PublishAuditEvent::record_evaluated(&CatalogRecordUpdate {
        catalog_id: catalog_id.clone(),
        record_id: RecordId::new("r1"),
        validity: json!({ "valid": true }),
        decision: Decision::Published {
            published_record: json!({ "id": "r1" }),
        },
        timestamp: Timestamp::from_unix_millis(110),
    }));
    drop(sink);

    let reopened = FileAuditSink::new(&path).unwrap();
    let mut summary = CatalogRunSummary::new(catalog_id.clone());
    summary.selected = 1;
    summary.published = 1;
    reopened.record(&PublishAuditEvent::catalog_summary(&summary));

    let lines: Vec<Value> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], json!("record_evaluated"));
    assert_eq!(lines[0]["record_id"], json!("r1"));
    assert_eq!(lines[0]["watermark"], json!(110));
    assert_eq!(lines[0]["published"], json!(true));
    assert!(lines[0].get("error").is_none());
    assert_eq!(lines[1]["event"], json!("catalog_summary"));
    assert_eq!(lines[1]["summary"]["published"], json!(1));
    assert!(lines[1].get("record_id").is_none());
}

/// Verifies sync failures carry status and retry count.
#[test]
fn sync_failure_event_carries_status_and_retries() {
    let mut record =
        SyncRecord::unsynced(CatalogId::new("DATACITE"), RecordId::new("r1"), Timestamp::from_unix_millis(5));
    record.error = Some("registry error 503".to_string());
    record.retries = Some(2);
    let event = PublishAuditEvent::record_sync_failed(
        &record,
        &RegistryError::status(503, json!("unavailable")),
    );
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["event"], json!("record_sync_failed"));
    assert_eq!(value["status"], json!(503));
    assert_eq!(value["retries"], json!(2));
    assert!(value["error"].as_str().unwrap().contains("503"));
}
