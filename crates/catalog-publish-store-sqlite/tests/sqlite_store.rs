// crates/catalog-publish-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate the SQLite record source and catalog record store.
// Purpose: Ensure watermark aggregation, durable decisions, and sync bookkeeping.
// Dependencies: catalog-publish-store-sqlite, catalog-publish-core, rusqlite, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed publication store. Exercises the
//! aggregate watermark query, decision and sync row persistence, sync
//! candidate eligibility, cascades, and fail-closed loading of corrupt rows.

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
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use catalog_publish_core::Catalog;
use catalog_publish_core::CatalogId;
use catalog_publish_core::CatalogRecordStore;
use catalog_publish_core::CatalogRecordUpdate;
use catalog_publish_core::CollectionId;
use catalog_publish_core::Decision;
use catalog_publish_core::Doi;
use catalog_publish_core::Record;
use catalog_publish_core::RecordId;
use catalog_publish_core::RecordSource;
use catalog_publish_core::SchemaId;
use catalog_publish_core::SchemaUri;
use catalog_publish_core::StoreError;
use catalog_publish_core::SyncRecord;
use catalog_publish_core::TagCardinality;
use catalog_publish_core::TagId;
use catalog_publish_core::TagInstance;
use catalog_publish_core::Timestamp;
use catalog_publish_core::UserId;
use catalog_publish_core::select_stale;
use catalog_publish_store_sqlite::SqlitePublicationStore;
use catalog_publish_store_sqlite::SqliteStoreConfig;
use catalog_publish_store_sqlite::SqliteStoreError;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn ts(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

fn store_for(path: &std::path::Path) -> SqlitePublicationStore {
    SqlitePublicationStore::new(&SqliteStoreConfig::at(path)).expect("store init")
}

fn seeded(dir: &TempDir) -> SqlitePublicationStore {
    let store = store_for(&dir.path().join("store.db"));
    store
        .upsert_catalog(&Catalog {
            id: CatalogId::new("SAEON"),
            schema_uri: Some(SchemaUri::new("schema:sid-or-doi")),
            schema_timestamp: ts(1),
        })
        .unwrap();
    store
}

fn record(id: &str, doi: Option<&str>, sid: Option<&str>, at: i64) -> Record {
    Record {
        id: RecordId::new(id),
        doi: doi.map(Doi::new),
        sid: sid.map(str::to_string),
        collection_id: CollectionId::new("c1"),
        schema_id: SchemaId::new("saeon-iso19115"),
        metadata: json!({ "titles": [{ "title": format!("Dataset {id}") }] }),
        timestamp: ts(at),
    }
}

fn tag(tag_id: &str, at: i64, public: bool) -> TagInstance {
    TagInstance {
        tag_id: TagId::new(tag_id),
        user_id: Some(UserId::new("u1")),
        user_name: Some("Ada".to_string()),
        data: json!({ "value": tag_id }),
        timestamp: ts(at),
        cardinality: TagCardinality::Multi,
        public,
    }
}

fn hidden(record_id: &str, at: i64) -> CatalogRecordUpdate {
    CatalogRecordUpdate {
        catalog_id: CatalogId::new("SAEON"),
        record_id: RecordId::new(record_id),
        validity: json!({ "valid": false }),
        decision: Decision::Hidden,
        timestamp: ts(at),
    }
}

fn published(record_id: &str, at: i64) -> CatalogRecordUpdate {
    CatalogRecordUpdate {
        catalog_id: CatalogId::new("SAEON"),
        record_id: RecordId::new(record_id),
        validity: json!({ "valid": true }),
        decision: Decision::Published {
            published_record: json!({ "id": record_id }),
        },
        timestamp: ts(at),
    }
}

fn saeon() -> CatalogId {
    CatalogId::new("SAEON")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies the aggregate query reports each staleness input per record.
#[test]
fn sqlite_store_aggregates_watermarks() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    store.upsert_record(&record("r1", None, Some("a"), 100)).unwrap();
    store.upsert_record(&record("r2", None, Some("b"), 50)).unwrap();
    store.add_record_tag(&RecordId::new("r1"), &tag("keyword", 120, true)).unwrap();
    store.add_record_tag(&RecordId::new("r1"), &tag("keyword", 110, true)).unwrap();
    store.add_collection_tag(&CollectionId::new("c1"), &tag("featured", 90, true)).unwrap();
    store.upsert_catalog_record(&hidden("r2", 50)).unwrap();

    let rows = store.record_watermarks(&saeon()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].record_id, RecordId::new("r1"));
    assert_eq!(rows[0].watermark.record_timestamp, ts(100));
    assert_eq!(rows[0].watermark.latest_record_tag, Some(ts(120)));
    assert_eq!(rows[0].watermark.latest_collection_tag, Some(ts(90)));
    assert_eq!(rows[0].watermark.evaluated_at, None);
    assert_eq!(rows[1].watermark.latest_record_tag, None);
    assert_eq!(rows[1].watermark.evaluated_at, Some(ts(50)));
}

/// Verifies selection over the SQLite store honors stored watermarks.
#[test]
fn sqlite_store_drives_stale_selection() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    store.upsert_record(&record("r1", None, Some("a"), 100)).unwrap();
    store.upsert_record(&record("r2", None, Some("b"), 100)).unwrap();
    store.upsert_catalog_record(&hidden("r2", 100)).unwrap();

    let catalog = store.catalog(&saeon()).unwrap().unwrap();
    let stale = select_stale(&store, &catalog).unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].record_id, RecordId::new("r1"));
    assert_eq!(stale[0].latest, ts(100));
}

/// Verifies snapshots carry tags with their types and user names.
#[test]
fn sqlite_store_loads_record_snapshots() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    store.upsert_record(&record("r1", Some("10.1234/abc"), None, 100)).unwrap();
    store.add_record_tag(&RecordId::new("r1"), &tag("private-note", 105, false)).unwrap();
    store.add_collection_tag(&CollectionId::new("c1"), &tag("featured", 90, true)).unwrap();

    let snapshot = store.record_snapshot(&RecordId::new("r1")).unwrap().unwrap();
    assert_eq!(snapshot.record, record("r1", Some("10.1234/abc"), None, 100));
    assert_eq!(snapshot.record_tags, vec![tag("private-note", 105, false)]);
    assert_eq!(snapshot.collection_tags, vec![tag("featured", 90, true)]);
    assert!(store.record_snapshot(&RecordId::new("missing")).unwrap().is_none());
}

/// Verifies a record without a DOI or sid is rejected.
#[test]
fn sqlite_store_rejects_unidentified_record() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    let err = store.upsert_record(&record("r1", None, None, 100)).unwrap_err();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

/// Verifies decisions upsert in place and persist across instances.
#[test]
fn sqlite_store_persists_decisions_across_instances() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    {
        let store = seeded(&dir);
        store.upsert_record(&record("r1", None, Some("a"), 100)).unwrap();
        store.upsert_catalog_record(&hidden("r1", 100)).unwrap();
        store.upsert_catalog_record(&published("r1", 120)).unwrap();
    }
    let store = store_for(&path);
    let loaded = store.catalog_record(&saeon(), &RecordId::new("r1")).unwrap().unwrap();
    assert!(loaded.published());
    assert_eq!(loaded.published_record(), Some(&json!({ "id": "r1" })));
    assert_eq!(loaded.validity, json!({ "valid": true }));
    assert_eq!(loaded.timestamp, ts(120));
}

/// Verifies a decision for an unknown record is refused.
#[test]
fn sqlite_store_rejects_decision_for_unknown_record() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    let err = store.upsert_catalog_record(&hidden("ghost", 100)).unwrap_err();
    assert!(matches!(err, StoreError::Store(_)));
}

/// Verifies changed-since filters strictly newer decisions.
#[test]
fn sqlite_store_lists_decisions_changed_since() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    for (id, at) in [("r1", 100), ("r2", 200), ("r3", 300)] {
        store.upsert_record(&record(id, None, Some(id), at)).unwrap();
        store.upsert_catalog_record(&hidden(id, at)).unwrap();
    }
    let all = store.catalog_records_changed_since(&saeon(), None).unwrap();
    assert_eq!(all.len(), 3);
    let recent = store.catalog_records_changed_since(&saeon(), Some(ts(200))).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].record_id, RecordId::new("r3"));
}

/// Verifies sync candidate eligibility and the batch limit.
#[test]
fn sqlite_store_selects_sync_candidates() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    for id in ["r1", "r2", "r3", "r4"] {
        store.upsert_record(&record(id, None, Some(id), 100)).unwrap();
        store.upsert_catalog_record(&published(id, 100)).unwrap();
    }
    // r1: healthy and checked after the decision.
    let mut healthy = SyncRecord::unsynced(saeon(), RecordId::new("r1"), ts(150));
    healthy.published = true;
    store.save_sync_record(&healthy).unwrap();
    // r2: failing within budget.
    let mut retrying = SyncRecord::unsynced(saeon(), RecordId::new("r2"), ts(150));
    retrying.error = Some("registry error 503".to_string());
    retrying.retries = Some(1);
    store.save_sync_record(&retrying).unwrap();
    // r3: exhausted.
    let mut exhausted = retrying.clone();
    exhausted.record_id = RecordId::new("r3");
    exhausted.retries = Some(3);
    store.save_sync_record(&exhausted).unwrap();
    // r4: never synced.

    let candidates = store.sync_candidates(&saeon(), 3, 10).unwrap();
    let ids: Vec<&str> =
        candidates.iter().map(|candidate| candidate.catalog_record.record_id.as_str()).collect();
    assert_eq!(ids, vec!["r2", "r4"]);
    assert_eq!(candidates[0].sync.as_ref().unwrap().retries, Some(1));
    assert!(candidates[1].sync.is_none());

    store.upsert_catalog_record(&published("r3", 200)).unwrap();
    let candidates = store.sync_candidates(&saeon(), 3, 10).unwrap();
    assert_eq!(candidates.len(), 3);
    assert_eq!(store.sync_candidates(&saeon(), 3, 1).unwrap().len(), 1);
}

/// Verifies sync rows round-trip including the digest.
#[test]
fn sqlite_store_persists_sync_records() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    store.upsert_record(&record("r1", Some("10.1234/abc"), None, 100)).unwrap();
    store.upsert_catalog_record(&published("r1", 100)).unwrap();

    let payload = catalog_publish_core::RegistryPayload {
        doi: Doi::new("10.1234/abc"),
        url: "https://catalog.example.org/records/10.1234/abc".to_string(),
        metadata: json!({ "titles": [] }),
    };
    let sync = SyncRecord {
        catalog_id: saeon(),
        record_id: RecordId::new("r1"),
        doi: Some(payload.doi.clone()),
        url: Some(payload.url.clone()),
        metadata: Some(payload.metadata.clone()),
        digest: Some(payload.digest().unwrap()),
        published: true,
        updated: Some(ts(150)),
        checked: ts(150),
        error: None,
        retries: None,
    };
    store.save_sync_record(&sync).unwrap();
    let loaded = store.sync_record(&saeon(), &RecordId::new("r1")).unwrap().unwrap();
    assert_eq!(loaded, sync);
}

/// Verifies a sync row requires an existing decision.
#[test]
fn sqlite_store_rejects_orphan_sync_record() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    let orphan = SyncRecord::unsynced(saeon(), RecordId::new("ghost"), ts(1));
    assert!(store.save_sync_record(&orphan).is_err());
}

/// Verifies deleting a record cascades to its decisions and sync rows.
#[test]
fn sqlite_store_cascades_record_deletion() {
    let dir = TempDir::new().unwrap();
    let store = seeded(&dir);
    store.upsert_record(&record("r1", None, Some("a"), 100)).unwrap();
    store.add_record_tag(&RecordId::new("r1"), &tag("keyword", 110, true)).unwrap();
    store.upsert_catalog_record(&published("r1", 110)).unwrap();
    store.save_sync_record(&SyncRecord::unsynced(saeon(), RecordId::new("r1"), ts(120))).unwrap();

    store.delete_record(&RecordId::new("r1")).unwrap();
    assert!(store.catalog_record(&saeon(), &RecordId::new("r1")).unwrap().is_none());
    assert!(store.sync_record(&saeon(), &RecordId::new("r1")).unwrap().is_none());
    assert!(store.record_watermarks(&saeon()).unwrap().is_empty());
}

/// Verifies a mismatched publish flag is reported as corruption.
#[test]
fn sqlite_store_detects_inconsistent_publish_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    let store = seeded(&dir);
    store.upsert_record(&record("r1", None, Some("a"), 100)).unwrap();
    store.upsert_catalog_record(&hidden("r1", 100)).unwrap();

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        "PRAGMA ignore_check_constraints = ON; \
         UPDATE catalog_record SET published = 1 WHERE record_id = 'r1';",
    )
    .unwrap();
    drop(conn);

    let err = store.catalog_record(&saeon(), &RecordId::new("r1")).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

/// Verifies an unknown schema version is rejected on open.
#[test]
fn sqlite_store_rejects_version_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    drop(store_for(&path));
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(conn);

    let result = SqlitePublicationStore::new(&SqliteStoreConfig::at(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

/// Verifies a directory path is rejected.
#[test]
fn sqlite_store_rejects_directory_path() {
    let dir = TempDir::new().unwrap();
    let result = SqlitePublicationStore::new(&SqliteStoreConfig::at(dir.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}
