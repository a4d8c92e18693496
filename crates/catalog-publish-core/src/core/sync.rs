// crates/catalog-publish-core/src/core/sync.rs
// ============================================================================
// Module: External Sync Records
// Description: Registry sync bookkeeping, payloads, and eligibility rules.
// Purpose: Model the per-record state machine driving DOI registry sync.
// Dependencies: crate::core::{catalog, hashing, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A [`SyncRecord`] remembers what the external registry was last told about a
//! record and whether the last attempt failed. The [`SyncState`] is derived
//! from that row rather than stored.
//!
//! Invariants:
//! - `retries` is `Some` only when `error` is `Some`.
//! - `retries` counts consecutive failures since the last success or the last
//!   watermark change.
//! - A row with `retries >= max_retries` is not eligible until the owning
//!   catalog record's watermark moves past `checked`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::catalog::CatalogRecord;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::SnapshotDigest;
use crate::core::identifiers::CatalogId;
use crate::core::identifiers::Doi;
use crate::core::identifiers::RecordId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Registry Payload
// ============================================================================

/// Candidate payload for the external registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryPayload {
    /// DOI to register.
    pub doi: Doi,
    /// Landing page URL.
    pub url: String,
    /// Registry metadata document.
    pub metadata: Value,
}

impl RegistryPayload {
    /// Extracts the payload from a published record document.
    ///
    /// Returns `None` when the document lacks a DOI, URL, or metadata.
    #[must_use]
    pub fn from_published_record(published_record: &Value) -> Option<Self> {
        let doi = published_record.get("doi")?.as_str()?;
        let url = published_record.get("url")?.as_str()?;
        let metadata = published_record.get("metadata")?.clone();
        Some(Self {
            doi: Doi::new(doi),
            url: url.to_string(),
            metadata,
        })
    }

    /// Returns true when the payload is acceptable to a DOI registry.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.doi.is_well_formed() && !self.url.trim().is_empty() && self.metadata.is_object()
    }

    /// Computes the canonical digest used for no-op detection.
    ///
    /// The DOI is lowercased so case-only differences are not treated as changes.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn digest(&self) -> Result<SnapshotDigest, HashError> {
        let canonical = serde_json::json!({
            "doi": self.doi.as_str().to_ascii_lowercase(),
            "url": self.url,
            "metadata": self.metadata,
        });
        SnapshotDigest::of(DEFAULT_HASH_ALGORITHM, &canonical)
    }
}

// ============================================================================
// SECTION: Sync Record
// ============================================================================

/// Derived synchronization state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// The registry holds no published content for the record.
    Unsynced,
    /// The registry holds the last-synced content.
    Published,
    /// The last attempt failed and retries remain.
    ErrorRetrying,
    /// The last attempt failed and the retry budget is spent.
    ErrorExhausted,
}

/// External registry bookkeeping for one (catalog, record) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Catalog identifier.
    pub catalog_id: CatalogId,
    /// Record identifier.
    pub record_id: RecordId,
    /// DOI last sent to the registry.
    pub doi: Option<Doi>,
    /// Landing page URL last sent to the registry.
    pub url: Option<String>,
    /// Metadata last sent to the registry.
    pub metadata: Option<Value>,
    /// Digest of the last-synced payload.
    pub digest: Option<SnapshotDigest>,
    /// Registry's last known publication state.
    pub published: bool,
    /// Last successful change.
    pub updated: Option<Timestamp>,
    /// Last sync attempt.
    pub checked: Timestamp,
    /// Last failure message.
    pub error: Option<String>,
    /// Consecutive failures.
    pub retries: Option<u32>,
}

impl SyncRecord {
    /// Creates an empty row for a pair the registry has never seen.
    #[must_use]
    pub const fn unsynced(catalog_id: CatalogId, record_id: RecordId, checked: Timestamp) -> Self {
        Self {
            catalog_id,
            record_id,
            doi: None,
            url: None,
            metadata: None,
            digest: None,
            published: false,
            updated: None,
            checked,
            error: None,
            retries: None,
        }
    }

    /// Stamps a successful attempt and clears failure bookkeeping.
    pub fn record_success(&mut self, checked: Timestamp) {
        self.checked = checked;
        self.error = None;
        self.retries = None;
    }

    /// Stamps a failed attempt; the first failure sets `retries` to 1.
    pub fn record_failure(&mut self, error: String, checked: Timestamp) {
        self.checked = checked;
        self.error = Some(error);
        self.retries = Some(self.retries.map_or(1, |retries| retries.saturating_add(1)));
    }

    /// Derives the state machine position for the configured retry budget.
    #[must_use]
    pub fn state(&self, max_retries: u32) -> SyncState {
        match (&self.error, self.retries) {
            (Some(_), Some(retries)) if retries >= max_retries => SyncState::ErrorExhausted,
            (Some(_), _) => SyncState::ErrorRetrying,
            (None, _) if self.published => SyncState::Published,
            (None, _) => SyncState::Unsynced,
        }
    }
}

/// Catalog record paired with its sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCandidate {
    /// Current publication decision.
    pub catalog_record: CatalogRecord,
    /// Existing sync row, if any.
    pub sync: Option<SyncRecord>,
}

// ============================================================================
// SECTION: Eligibility
// ============================================================================

/// Returns true when a catalog record should be offered to the synchronizer.
///
/// Eligible when the sync row is absent, the decision watermark moved past the
/// last check, or a failure is still within its retry budget.
#[must_use]
pub fn is_sync_eligible(
    sync: Option<&SyncRecord>,
    watermark: Timestamp,
    max_retries: u32,
) -> bool {
    let Some(sync) = sync else {
        return true;
    };
    if sync.checked < watermark {
        return true;
    }
    sync.error.is_some() && sync.retries.unwrap_or(0) < max_retries
}
