// crates/catalog-publish-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Publication Store
// Description: Mutex-guarded record source and catalog record store.
// Purpose: Provide a deterministic store for tests and local demos.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryPublicationStore`] holds records, tags, catalogs, and the rows
//! owned by the pipeline in ordered maps behind one mutex. Each trait call
//! takes the lock once, so every write is atomic. It is not intended for
//! production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::Catalog;
use crate::core::CatalogId;
use crate::core::CatalogRecord;
use crate::core::CatalogRecordUpdate;
use crate::core::CollectionId;
use crate::core::Record;
use crate::core::RecordId;
use crate::core::RecordSnapshot;
use crate::core::RecordWatermark;
use crate::core::RecordWatermarkRow;
use crate::core::SyncCandidate;
use crate::core::SyncRecord;
use crate::core::TagInstance;
use crate::core::Timestamp;
use crate::core::is_sync_eligible;
use crate::core::time::latest_of;
use crate::interfaces::CatalogRecordStore;
use crate::interfaces::RecordSource;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: State
// ============================================================================

/// Pair key for pipeline-owned rows.
type PairKey = (CatalogId, RecordId);

/// Store contents guarded by one mutex.
#[derive(Debug, Default)]
struct InMemoryState {
    /// Catalog rows.
    catalogs: BTreeMap<CatalogId, Catalog>,
    /// Record rows.
    records: BTreeMap<RecordId, Record>,
    /// Tags per record.
    record_tags: BTreeMap<RecordId, Vec<TagInstance>>,
    /// Tags per collection.
    collection_tags: BTreeMap<CollectionId, Vec<TagInstance>>,
    /// Publish decisions.
    catalog_records: BTreeMap<PairKey, CatalogRecord>,
    /// Registry sync rows.
    sync_records: BTreeMap<PairKey, SyncRecord>,
}

/// In-memory publication store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPublicationStore {
    /// Shared state.
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryPublicationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state.
    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Store("publication store mutex poisoned".to_string()))
    }

    /// Inserts or replaces a catalog row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn put_catalog(&self, catalog: Catalog) -> Result<(), StoreError> {
        self.lock()?.catalogs.insert(catalog.id.clone(), catalog);
        Ok(())
    }

    /// Inserts or replaces a record row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when the record has neither a DOI nor
    /// a secondary id.
    pub fn put_record(&self, record: Record) -> Result<(), StoreError> {
        if record.doi.is_none() && record.sid.is_none() {
            return Err(StoreError::Invalid(format!(
                "record {} requires a doi or a sid",
                record.id
            )));
        }
        self.lock()?.records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Attaches a tag instance to a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when the record does not exist.
    pub fn put_record_tag(&self, record_id: &RecordId, tag: TagInstance) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if !state.records.contains_key(record_id) {
            return Err(StoreError::Invalid(format!("record not found: {record_id}")));
        }
        state.record_tags.entry(record_id.clone()).or_default().push(tag);
        drop(state);
        Ok(())
    }

    /// Attaches a tag instance to a collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn put_collection_tag(
        &self,
        collection_id: &CollectionId,
        tag: TagInstance,
    ) -> Result<(), StoreError> {
        self.lock()?.collection_tags.entry(collection_id.clone()).or_default().push(tag);
        Ok(())
    }

    /// Deletes a record and cascades to its tags and pipeline rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store lock is poisoned.
    pub fn remove_record(&self, record_id: &RecordId) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.records.remove(record_id);
        state.record_tags.remove(record_id);
        state.catalog_records.retain(|(_, key_record), _| key_record != record_id);
        state.sync_records.retain(|(_, key_record), _| key_record != record_id);
        drop(state);
        Ok(())
    }
}

// ============================================================================
// SECTION: Record Source
// ============================================================================

impl RecordSource for InMemoryPublicationStore {
    fn catalog(&self, catalog_id: &CatalogId) -> Result<Option<Catalog>, StoreError> {
        Ok(self.lock()?.catalogs.get(catalog_id).cloned())
    }

    fn record_watermarks(
        &self,
        catalog_id: &CatalogId,
    ) -> Result<Vec<RecordWatermarkRow>, StoreError> {
        let state = self.lock()?;
        let rows = state
            .records
            .values()
            .map(|record| {
                let latest_record_tag = latest_of(
                    state
                        .record_tags
                        .get(&record.id)
                        .into_iter()
                        .flatten()
                        .map(|tag| Some(tag.timestamp)),
                );
                let latest_collection_tag = latest_of(
                    state
                        .collection_tags
                        .get(&record.collection_id)
                        .into_iter()
                        .flatten()
                        .map(|tag| Some(tag.timestamp)),
                );
                let evaluated_at = state
                    .catalog_records
                    .get(&(catalog_id.clone(), record.id.clone()))
                    .map(|row| row.timestamp);
                RecordWatermarkRow {
                    record_id: record.id.clone(),
                    watermark: RecordWatermark {
                        record_timestamp: record.timestamp,
                        latest_record_tag,
                        latest_collection_tag,
                        evaluated_at,
                    },
                }
            })
            .collect();
        drop(state);
        Ok(rows)
    }

    fn record_snapshot(&self, record_id: &RecordId) -> Result<Option<RecordSnapshot>, StoreError> {
        let state = self.lock()?;
        let Some(record) = state.records.get(record_id).cloned() else {
            return Ok(None);
        };
        let record_tags = state.record_tags.get(record_id).cloned().unwrap_or_default();
        let collection_tags =
            state.collection_tags.get(&record.collection_id).cloned().unwrap_or_default();
        drop(state);
        Ok(Some(RecordSnapshot {
            record,
            record_tags,
            collection_tags,
        }))
    }
}

// ============================================================================
// SECTION: Catalog Record Store
// ============================================================================

impl CatalogRecordStore for InMemoryPublicationStore {
    fn upsert_catalog_record(&self, update: &CatalogRecordUpdate) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if !state.catalogs.contains_key(&update.catalog_id) {
            return Err(StoreError::Invalid(format!("catalog not found: {}", update.catalog_id)));
        }
        if !state.records.contains_key(&update.record_id) {
            return Err(StoreError::Invalid(format!("record not found: {}", update.record_id)));
        }
        let key = (update.catalog_id.clone(), update.record_id.clone());
        state.catalog_records.insert(key, CatalogRecord::from(update.clone()));
        drop(state);
        Ok(())
    }

    fn catalog_record(
        &self,
        catalog_id: &CatalogId,
        record_id: &RecordId,
    ) -> Result<Option<CatalogRecord>, StoreError> {
        let key = (catalog_id.clone(), record_id.clone());
        Ok(self.lock()?.catalog_records.get(&key).cloned())
    }

    fn catalog_records_changed_since(
        &self,
        catalog_id: &CatalogId,
        since: Option<Timestamp>,
    ) -> Result<Vec<CatalogRecord>, StoreError> {
        let state = self.lock()?;
        let rows = state
            .catalog_records
            .values()
            .filter(|row| &row.catalog_id == catalog_id)
            .filter(|row| since.is_none_or(|since| row.timestamp > since))
            .cloned()
            .collect();
        drop(state);
        Ok(rows)
    }

    fn sync_candidates(
        &self,
        catalog_id: &CatalogId,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<SyncCandidate>, StoreError> {
        let decisions = self.catalog_records_changed_since(catalog_id, None)?;
        let state = self.lock()?;
        let candidates = decisions
            .into_iter()
            .filter_map(|catalog_record| {
                let key = (catalog_record.catalog_id.clone(), catalog_record.record_id.clone());
                let sync = state.sync_records.get(&key).cloned();
                is_sync_eligible(sync.as_ref(), catalog_record.timestamp, max_retries).then_some(
                    SyncCandidate {
                        catalog_record,
                        sync,
                    },
                )
            })
            .take(limit)
            .collect();
        drop(state);
        Ok(candidates)
    }

    fn save_sync_record(&self, record: &SyncRecord) -> Result<(), StoreError> {
        let key = (record.catalog_id.clone(), record.record_id.clone());
        let mut state = self.lock()?;
        if !state.catalog_records.contains_key(&key) {
            return Err(StoreError::Invalid(format!(
                "no catalog record for sync row {}/{}",
                record.catalog_id, record.record_id
            )));
        }
        state.sync_records.insert(key, record.clone());
        drop(state);
        Ok(())
    }

    fn sync_record(
        &self,
        catalog_id: &CatalogId,
        record_id: &RecordId,
    ) -> Result<Option<SyncRecord>, StoreError> {
        let key = (catalog_id.clone(), record_id.clone());
        Ok(self.lock()?.sync_records.get(&key).cloned())
    }
}
