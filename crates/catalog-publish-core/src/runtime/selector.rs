// crates/catalog-publish-core/src/runtime/selector.rs
// ============================================================================
// Module: Stale Record Selector
// Description: Watermark comparison across record, tag, and schema timestamps.
// Purpose: Decide which (catalog, record) pairs need (re-)evaluation.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! A record is stale for a catalog when it has never been evaluated there, or
//! when the latest of its contributing timestamps is strictly newer than the
//! stored watermark. Contributing timestamps are the catalog schema's
//! timestamp, the record's own timestamp, and the newest record tag and
//! collection tag. Missing tag terms never win the maximum.
//!
//! Selection re-derives staleness from current state on every pass, so an
//! interrupted run is picked up by the next one with no persisted queue.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Catalog;
use crate::core::CatalogId;
use crate::core::RecordWatermark;
use crate::core::RecordWatermarkRow;
use crate::core::StaleRecord;
use crate::core::Timestamp;
use crate::core::time::latest_of;
use crate::interfaces::RecordSource;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that abort selection for a catalog.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The catalog is not present in the store.
    #[error("catalog not found: {0}")]
    UnknownCatalog(CatalogId),
    /// The catalog has no publication schema configured.
    #[error("catalog {0} has no publication schema")]
    MissingSchema(CatalogId),
    /// The aggregate timestamp query failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Returns the latest contributing timestamp for one record.
#[must_use]
pub fn latest_contributing(schema_timestamp: Timestamp, watermark: &RecordWatermark) -> Timestamp {
    latest_of([
        Some(schema_timestamp),
        Some(watermark.record_timestamp),
        watermark.latest_record_tag,
        watermark.latest_collection_tag,
    ])
    .unwrap_or(schema_timestamp)
}

/// Returns true when a record must be (re-)evaluated.
#[must_use]
pub fn is_stale(schema_timestamp: Timestamp, watermark: &RecordWatermark) -> bool {
    match watermark.evaluated_at {
        None => true,
        Some(evaluated_at) => evaluated_at < latest_contributing(schema_timestamp, watermark),
    }
}

/// Filters aggregate rows down to stale records, ordered by record id.
#[must_use]
pub fn stale_records(schema_timestamp: Timestamp, rows: &[RecordWatermarkRow]) -> Vec<StaleRecord> {
    let mut stale: Vec<StaleRecord> = rows
        .iter()
        .filter(|row| is_stale(schema_timestamp, &row.watermark))
        .map(|row| StaleRecord {
            record_id: row.record_id.clone(),
            latest: latest_contributing(schema_timestamp, &row.watermark),
        })
        .collect();
    stale.sort();
    stale
}

/// Computes the stale records of a catalog from the store.
///
/// # Errors
///
/// Returns [`SelectionError`] when the catalog is misconfigured or the store
/// query fails.
pub fn select_stale<S>(source: &S, catalog: &Catalog) -> Result<Vec<StaleRecord>, SelectionError>
where
    S: RecordSource + ?Sized,
{
    if catalog.schema_uri.is_none() {
        return Err(SelectionError::MissingSchema(catalog.id.clone()));
    }
    let rows = source.record_watermarks(&catalog.id)?;
    Ok(stale_records(catalog.schema_timestamp, &rows))
}

/// Loads a catalog row, failing when it is absent.
///
/// # Errors
///
/// Returns [`SelectionError::UnknownCatalog`] when the catalog is absent.
pub fn load_catalog<S>(source: &S, catalog_id: &CatalogId) -> Result<Catalog, SelectionError>
where
    S: RecordSource + ?Sized,
{
    source.catalog(catalog_id)?.ok_or_else(|| SelectionError::UnknownCatalog(catalog_id.clone()))
}
