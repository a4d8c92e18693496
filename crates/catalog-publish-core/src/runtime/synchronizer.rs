// crates/catalog-publish-core/src/runtime/synchronizer.rs
// ============================================================================
// Module: External Registry Synchronizer
// Description: Reconciles catalog decisions with an external DOI registry.
// Purpose: Drive the per-record sync state machine with bounded retries.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! For each eligible catalog record the synchronizer decides whether the
//! registry must retract an old registration, publish new content, or do
//! nothing. Registry failures never propagate: they become the stored
//! `error`/`retries` pair and the pass moves on.
//!
//! Invariants:
//! - `checked` is stamped on every attempt, including no-ops and failures.
//! - A failed attempt never updates the last-synced snapshot.
//! - A watermark newer than `checked` discards prior failures before the
//!   attempt, so edited records re-enter the normal flow.
//! - Each record's outcome is saved by its own store write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::Doi;
use crate::core::RegistryPayload;
use crate::core::SnapshotDigest;
use crate::core::SyncCandidate;
use crate::core::SyncRecord;
use crate::core::Timestamp;
use crate::interfaces::CatalogRecordStore;
use crate::interfaces::Clock;
use crate::interfaces::RegistryClient;
use crate::interfaces::RegistryError;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Registry status for a DOI that is already absent.
const STATUS_NOT_FOUND: u16 = 404;
/// Registry status for a DOI that is registered and cannot be deleted.
const STATUS_METHOD_NOT_ALLOWED: u16 = 405;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Registry calls issued for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// No registry call was needed.
    Unchanged,
    /// New content was published.
    Published,
    /// An old registration was retracted.
    Retracted,
    /// An old registration was retracted and new content published.
    Replaced,
}

impl SyncAction {
    /// Returns the audit label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Published => "published",
            Self::Retracted => "retracted",
            Self::Replaced => "replaced",
        }
    }
}

/// Result of synchronizing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The attempt succeeded.
    Synced {
        /// Registry calls issued.
        action: SyncAction,
        /// Saved sync row.
        record: SyncRecord,
    },
    /// The registry rejected a call; the failure was recorded.
    Failed {
        /// Registry error.
        error: RegistryError,
        /// Saved sync row.
        record: SyncRecord,
    },
}

// ============================================================================
// SECTION: Synchronizer
// ============================================================================

/// Per-catalog registry synchronizer.
pub struct Synchronizer<'a, S: ?Sized> {
    /// Catalog record store.
    store: &'a S,
    /// External registry client.
    registry: &'a dyn RegistryClient,
    /// Source of attempt timestamps.
    clock: &'a dyn Clock,
    /// Consecutive failures tolerated before exhaustion.
    max_retries: u32,
}

impl<'a, S> Synchronizer<'a, S>
where
    S: CatalogRecordStore + ?Sized,
{
    /// Creates a synchronizer.
    #[must_use]
    pub fn new(
        store: &'a S,
        registry: &'a dyn RegistryClient,
        clock: &'a dyn Clock,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            max_retries,
        }
    }

    /// Returns the configured retry budget.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Synchronizes one candidate and saves its sync row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the sync row cannot be saved. Registry
    /// failures are reported through [`SyncOutcome::Failed`] instead.
    pub fn sync(&self, candidate: &SyncCandidate) -> Result<SyncOutcome, StoreError> {
        let now = self.clock.now();
        let catalog_record = &candidate.catalog_record;
        let mut row = match &candidate.sync {
            Some(existing) => {
                let mut row = existing.clone();
                if row.checked < catalog_record.timestamp {
                    row.error = None;
                    row.retries = None;
                }
                row
            }
            None => SyncRecord::unsynced(
                catalog_record.catalog_id.clone(),
                catalog_record.record_id.clone(),
                now,
            ),
        };

        let result = registry_target(candidate)
            .and_then(|target| self.reconcile(&mut row, target, now));
        let outcome = match result {
            Ok(action) => {
                row.record_success(now);
                SyncOutcome::Synced {
                    action,
                    record: row.clone(),
                }
            }
            Err(error) => {
                row.record_failure(error.to_string(), now);
                SyncOutcome::Failed {
                    error,
                    record: row.clone(),
                }
            }
        };
        self.store.save_sync_record(&row)?;
        Ok(outcome)
    }

    /// Issues the registry calls needed to match the decision.
    ///
    /// `row` reflects every call that succeeded, even when a later one fails.
    fn reconcile(
        &self,
        row: &mut SyncRecord,
        target: Option<(RegistryPayload, SnapshotDigest)>,
        now: Timestamp,
    ) -> Result<SyncAction, RegistryError> {
        let mut retracted = false;
        let identifier_changed = match (&target, &row.doi) {
            (Some((payload, _)), Some(current)) => payload.doi != *current,
            _ => false,
        };
        if row.published && (target.is_none() || identifier_changed) {
            if let Some(current) = row.doi.clone() {
                self.retract(&current)?;
            }
            row.published = false;
            row.digest = None;
            row.updated = Some(now);
            retracted = true;
        }

        let Some((payload, digest)) = target else {
            return Ok(if retracted { SyncAction::Retracted } else { SyncAction::Unchanged });
        };
        let unchanged =
            row.published && row.digest.as_ref().is_some_and(|current| current.matches(&digest));
        if unchanged {
            return Ok(SyncAction::Unchanged);
        }

        self.registry.publish(&payload)?;
        row.doi = Some(payload.doi);
        row.url = Some(payload.url);
        row.metadata = Some(payload.metadata);
        row.digest = Some(digest);
        row.published = true;
        row.updated = Some(now);
        Ok(if retracted { SyncAction::Replaced } else { SyncAction::Published })
    }

    /// Removes a registration, hiding it when the registry refuses deletion.
    fn retract(&self, doi: &Doi) -> Result<(), RegistryError> {
        match self.registry.unpublish(doi) {
            Ok(()) => Ok(()),
            Err(error) if error.status == Some(STATUS_NOT_FOUND) => Ok(()),
            Err(error) if error.status == Some(STATUS_METHOD_NOT_ALLOWED) => {
                self.registry.hide(doi)
            }
            Err(error) => Err(error),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the payload the registry should hold, with its digest.
///
/// `None` means the registry should hold nothing for this record. A digest
/// failure is reported like a registry failure so the attempt is still
/// stamped and counted.
fn registry_target(
    candidate: &SyncCandidate,
) -> Result<Option<(RegistryPayload, SnapshotDigest)>, RegistryError> {
    let catalog_record = &candidate.catalog_record;
    if !catalog_record.published() {
        return Ok(None);
    }
    let Some(payload) = catalog_record
        .published_record()
        .and_then(RegistryPayload::from_published_record)
        .filter(RegistryPayload::is_well_formed)
    else {
        return Ok(None);
    };
    let digest = payload
        .digest()
        .map_err(|err| RegistryError::transport(format!("payload digest failed: {err}")))?;
    Ok(Some((payload, digest)))
}
