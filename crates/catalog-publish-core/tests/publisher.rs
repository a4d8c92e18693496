// crates/catalog-publish-core/tests/publisher.rs
// ============================================================================
// Module: Publisher Orchestrator Tests
// Description: End-to-end publish passes over the in-memory store.
// Purpose: Ensure runs are idempotent, per-record failures are isolated, and
//          catalog failures do not block other catalogs.
// Dependencies: catalog-publish-core, serde_json
// ============================================================================
//! ## Overview
//! Runs the publisher against seeded records with fake schemas, a scripted
//! registry, a fixed clock, and a recording audit sink.

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

mod common;

use std::sync::Arc;

use catalog_publish_core::Catalog;
use catalog_publish_core::CatalogId;
use catalog_publish_core::CatalogRecord;
use catalog_publish_core::CatalogRecordStore;
use catalog_publish_core::CatalogRecordUpdate;
use catalog_publish_core::CatalogTarget;
use catalog_publish_core::FixedClock;
use catalog_publish_core::InMemoryPublicationStore;
use catalog_publish_core::Publisher;
use catalog_publish_core::PublisherConfig;
use catalog_publish_core::PublisherError;
use catalog_publish_core::RecordId;
use catalog_publish_core::RecordSnapshot;
use catalog_publish_core::RecordSource;
use catalog_publish_core::RecordWatermarkRow;
use catalog_publish_core::StoreError;
use catalog_publish_core::SyncCandidate;
use catalog_publish_core::SyncRecord;
use catalog_publish_core::SyncState;
use catalog_publish_core::Timestamp;
use common::FakeSchemaCatalog;
use common::RecordingAuditSink;
use common::RegistryCall;
use common::ScriptedRegistry;
use common::datacite_definition;
use common::native_definition;
use common::record;
use common::seeded_store;
use common::ts;
use common::unavailable;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

struct Harness {
    store: InMemoryPublicationStore,
    registry: Arc<ScriptedRegistry>,
    clock: Arc<FixedClock>,
    audit: Arc<RecordingAuditSink>,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: seeded_store(),
            registry: Arc::new(ScriptedRegistry::default()),
            clock: Arc::new(FixedClock::new(ts(10_000))),
            audit: Arc::new(RecordingAuditSink::default()),
        }
    }

    fn targets(&self) -> Vec<CatalogTarget> {
        vec![
            CatalogTarget::local(native_definition("SAEON")),
            CatalogTarget::with_registry(datacite_definition("DATACITE"), self.registry.clone()),
        ]
    }

    fn publisher(&self) -> Publisher<InMemoryPublicationStore, FakeSchemaCatalog> {
        self.publisher_over(self.store.clone())
    }

    fn publisher_over<S>(&self, store: S) -> Publisher<S, FakeSchemaCatalog>
    where
        S: RecordSource + CatalogRecordStore,
    {
        Publisher::new(
            store,
            FakeSchemaCatalog::standard(),
            self.clock.clone(),
            self.audit.clone(),
            self.targets(),
            PublisherConfig {
                batch_size: 10,
                max_retries: 3,
            },
        )
        .unwrap()
    }

    fn catalog_record(&self, catalog: &str, record: &str) -> Option<CatalogRecord> {
        self.store.catalog_record(&CatalogId::new(catalog), &RecordId::new(record)).unwrap()
    }
}

/// Store that fails catalog record writes for one record id.
#[derive(Clone)]
struct FailingUpsertStore {
    inner: InMemoryPublicationStore,
    poisoned: RecordId,
}

impl RecordSource for FailingUpsertStore {
    fn catalog(&self, catalog_id: &CatalogId) -> Result<Option<Catalog>, StoreError> {
        self.inner.catalog(catalog_id)
    }

    fn record_watermarks(
        &self,
        catalog_id: &CatalogId,
    ) -> Result<Vec<RecordWatermarkRow>, StoreError> {
        self.inner.record_watermarks(catalog_id)
    }

    fn record_snapshot(&self, record_id: &RecordId) -> Result<Option<RecordSnapshot>, StoreError> {
        self.inner.record_snapshot(record_id)
    }
}

impl CatalogRecordStore for FailingUpsertStore {
    fn upsert_catalog_record(&self, update: &CatalogRecordUpdate) -> Result<(), StoreError> {
        if update.record_id == self.poisoned {
            return Err(StoreError::Io("disk full".to_string()));
        }
        self.inner.upsert_catalog_record(update)
    }

    fn catalog_record(
        &self,
        catalog_id: &CatalogId,
        record_id: &RecordId,
    ) -> Result<Option<CatalogRecord>, StoreError> {
        self.inner.catalog_record(catalog_id, record_id)
    }

    fn catalog_records_changed_since(
        &self,
        catalog_id: &CatalogId,
        since: Option<Timestamp>,
    ) -> Result<Vec<CatalogRecord>, StoreError> {
        self.inner.catalog_records_changed_since(catalog_id, since)
    }

    fn sync_candidates(
        &self,
        catalog_id: &CatalogId,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<SyncCandidate>, StoreError> {
        self.inner.sync_candidates(catalog_id, max_retries, limit)
    }

    fn save_sync_record(&self, record: &SyncRecord) -> Result<(), StoreError> {
        self.inner.save_sync_record(record)
    }

    fn sync_record(
        &self,
        catalog_id: &CatalogId,
        record_id: &RecordId,
    ) -> Result<Option<SyncRecord>, StoreError> {
        self.inner.sync_record(catalog_id, record_id)
    }
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// Verifies a sid-only record publishes natively and is hidden from DATACITE.
#[test]
fn sid_only_record_scenario() {
    let harness = Harness::new();
    harness.store.put_record(record("r1", None, Some("abc"), 100)).unwrap();

    let summary = harness.publisher().run();
    let saeon = summary.catalog(&CatalogId::new("SAEON")).unwrap();
    assert_eq!((saeon.selected, saeon.published, saeon.hidden), (1, 1, 0));
    let datacite = summary.catalog(&CatalogId::new("DATACITE")).unwrap();
    assert_eq!((datacite.selected, datacite.published, datacite.hidden), (1, 0, 1));
    assert_eq!(datacite.synced, 0);
    assert!(harness.registry.calls().is_empty());

    let native = harness.catalog_record("SAEON", "r1").unwrap();
    assert!(native.published());
    let hidden = harness.catalog_record("DATACITE", "r1").unwrap();
    assert!(!hidden.published());
    assert!(hidden.published_record().is_none());
}

/// Verifies a second run over unchanged data selects nothing and changes nothing.
#[test]
fn rerun_is_idempotent() {
    let harness = Harness::new();
    harness.store.put_record(record("r1", Some("10.1234/abc"), None, 100)).unwrap();
    let publisher = harness.publisher();

    let first = publisher.run();
    assert!(first.is_clean());
    let saeon_before = harness.catalog_record("SAEON", "r1").unwrap();
    let datacite_before = harness.catalog_record("DATACITE", "r1").unwrap();
    harness.registry.clear_calls();

    let second = publisher.run();
    for catalog in &second.catalogs {
        assert_eq!(catalog.selected, 0);
        assert_eq!(catalog.synced, 0);
    }
    assert_eq!(harness.catalog_record("SAEON", "r1").unwrap(), saeon_before);
    assert_eq!(harness.catalog_record("DATACITE", "r1").unwrap(), datacite_before);
    assert!(harness.registry.calls().is_empty());
}

/// Verifies an irrelevant timestamp bump re-selects but keeps the document.
#[test]
fn irrelevant_edit_reproduces_published_record() {
    let harness = Harness::new();
    harness.store.put_record(record("r1", None, Some("abc"), 100)).unwrap();
    let publisher = harness.publisher();
    let _ = publisher.run();
    let before = harness.catalog_record("SAEON", "r1").unwrap();

    harness.store.put_record(record("r1", None, Some("abc"), 200)).unwrap();
    let summary = publisher.run();
    assert_eq!(summary.catalog(&CatalogId::new("SAEON")).unwrap().selected, 1);

    let after = harness.catalog_record("SAEON", "r1").unwrap();
    assert_eq!(after.timestamp, ts(200));
    assert!(after.timestamp > before.timestamp);
    assert_eq!(after.published_record(), before.published_record());
}

/// Verifies three 503s exhaust sync and an edit makes the record eligible again.
#[test]
fn transient_failures_exhaust_then_recover_after_edit() {
    let harness = Harness::new();
    harness.store.put_record(record("r1", Some("10.1234/abc"), None, 100)).unwrap();
    let publisher = harness.publisher();
    let datacite = CatalogId::new("DATACITE");

    for attempt in 1_u32 ..= 3 {
        harness.registry.fail_next_publish(unavailable());
        harness.clock.set(ts(10_000 + i64::from(attempt)));
        let summary = publisher.run();
        assert_eq!(summary.catalog(&datacite).unwrap().sync_errors, 1);
    }
    let row = harness.store.sync_record(&datacite, &RecordId::new("r1")).unwrap().unwrap();
    assert_eq!(row.state(3), SyncState::ErrorExhausted);

    harness.registry.clear_calls();
    let idle = publisher.run();
    assert_eq!(idle.catalog(&datacite).unwrap().sync_errors, 0);
    assert!(harness.registry.calls().is_empty());

    harness.store.put_record(record("r1", Some("10.1234/abc"), None, 20_000)).unwrap();
    harness.clock.set(ts(30_000));
    let healed = publisher.run();
    assert_eq!(healed.catalog(&datacite).unwrap().synced, 1);
    assert_eq!(harness.registry.calls(), vec![RegistryCall::Publish("10.1234/abc".to_string())]);
    let row = harness.store.sync_record(&datacite, &RecordId::new("r1")).unwrap().unwrap();
    assert_eq!(row.retries, None);
    assert!(row.published);
}

// ============================================================================
// SECTION: Failure Isolation
// ============================================================================

/// Verifies a persistence failure on one record does not block the others.
#[test]
fn persistence_failure_is_isolated_to_one_record() {
    let harness = Harness::new();
    harness.store.put_record(record("r1", None, Some("a"), 100)).unwrap();
    harness.store.put_record(record("r2", None, Some("b"), 100)).unwrap();
    let failing = FailingUpsertStore {
        inner: harness.store.clone(),
        poisoned: RecordId::new("r1"),
    };

    let summary = harness.publisher_over(failing).run();
    let saeon = summary.catalog(&CatalogId::new("SAEON")).unwrap();
    assert_eq!((saeon.selected, saeon.published, saeon.failed), (2, 1, 1));
    assert!(harness.catalog_record("SAEON", "r1").is_none());
    assert!(harness.catalog_record("SAEON", "r2").is_some());
    assert!(harness.audit.event_names().contains(&"record_failed"));

    let retry = harness.publisher().run();
    assert_eq!(retry.catalog(&CatalogId::new("SAEON")).unwrap().selected, 1);
}

/// Verifies a catalog failure is reported and later catalogs still run.
#[test]
fn catalog_failure_does_not_block_other_catalogs() {
    let harness = Harness::new();
    harness.store.put_record(record("r1", Some("10.1234/abc"), None, 100)).unwrap();
    harness
        .store
        .put_catalog(Catalog {
            id: CatalogId::new("SAEON"),
            schema_uri: None,
            schema_timestamp: ts(1),
        })
        .unwrap();

    let summary = harness.publisher().run();
    let saeon = summary.catalog(&CatalogId::new("SAEON")).unwrap();
    assert!(saeon.error.as_deref().unwrap().contains("no publication schema"));
    assert!(!summary.is_clean());
    let datacite = summary.catalog(&CatalogId::new("DATACITE")).unwrap();
    assert_eq!(datacite.published, 1);
    assert_eq!(datacite.synced, 1);
    assert!(harness.audit.event_names().contains(&"catalog_failed"));
}

/// Verifies every catalog pass ends with a summary event.
#[test]
fn run_emits_summary_events() {
    let harness = Harness::new();
    harness.store.put_record(record("r1", Some("10.1234/abc"), None, 100)).unwrap();
    let _ = harness.publisher().run();

    let events = harness.audit.events();
    let summaries: Vec<_> = events.iter().filter(|event| event.event == "catalog_summary").collect();
    assert_eq!(summaries.len(), 2);
    let synced = events.iter().find(|event| event.event == "record_synced").unwrap();
    assert_eq!(synced.action, Some("published"));
    assert_eq!(serde_json::to_value(synced).unwrap()["record_id"], json!("r1"));
}

/// Verifies the sync pass honors the batch size.
#[test]
fn sync_pass_is_capped_by_batch_size() {
    let harness = Harness::new();
    for index in 0 .. 5 {
        let id = format!("r{index}");
        let doi = format!("10.1234/{index}");
        harness.store.put_record(record(&id, Some(&doi), None, 100)).unwrap();
    }
    let publisher = Publisher::new(
        harness.store.clone(),
        FakeSchemaCatalog::standard(),
        harness.clock.clone(),
        harness.audit.clone(),
        harness.targets(),
        PublisherConfig {
            batch_size: 2,
            max_retries: 3,
        },
    )
    .unwrap();

    let first = publisher.run();
    assert_eq!(first.catalog(&CatalogId::new("DATACITE")).unwrap().synced, 2);
    let second = publisher.run();
    assert_eq!(second.catalog(&CatalogId::new("DATACITE")).unwrap().synced, 2);
    let third = publisher.run();
    assert_eq!(third.catalog(&CatalogId::new("DATACITE")).unwrap().synced, 1);
}

/// Verifies invalid limits and duplicate catalogs are rejected.
#[test]
fn invalid_configuration_is_rejected() {
    let harness = Harness::new();
    let zero_batch = Publisher::new(
        harness.store.clone(),
        FakeSchemaCatalog::standard(),
        harness.clock.clone(),
        harness.audit.clone(),
        harness.targets(),
        PublisherConfig {
            batch_size: 0,
            max_retries: 3,
        },
    );
    assert!(matches!(zero_batch, Err(PublisherError::InvalidConfig(_))));

    let mut targets = harness.targets();
    targets.push(CatalogTarget::local(native_definition("SAEON")));
    let duplicate = Publisher::new(
        harness.store.clone(),
        FakeSchemaCatalog::standard(),
        harness.clock.clone(),
        harness.audit.clone(),
        targets,
        PublisherConfig::default(),
    );
    assert!(matches!(duplicate, Err(PublisherError::InvalidConfig(_))));
}
