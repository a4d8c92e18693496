// crates/catalog-publish-core/src/core/summary.rs
// ============================================================================
// Module: Publish Run Summaries
// Description: Per-catalog and per-run outcome counters.
// Purpose: Report what a publish run selected, decided, and synced.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Summaries are plain counters serialized into the `catalog_summary` audit
//! event and printed by the CLI. A catalog that failed before evaluating any
//! record carries its failure message and zero counts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CatalogId;

// ============================================================================
// SECTION: Summaries
// ============================================================================

/// Outcome counters for one catalog within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRunSummary {
    /// Catalog identifier.
    pub catalog_id: CatalogId,
    /// Records selected as stale.
    pub selected: u64,
    /// Records evaluated as published.
    pub published: u64,
    /// Records evaluated as hidden.
    pub hidden: u64,
    /// Records whose evaluation or persistence failed.
    pub failed: u64,
    /// Records for which a registry call succeeded.
    pub synced: u64,
    /// Records checked with no registry call required.
    pub unchanged: u64,
    /// Records whose registry sync failed.
    pub sync_errors: u64,
    /// Catalog-level failure that aborted this catalog's pass.
    pub error: Option<String>,
}

impl CatalogRunSummary {
    /// Creates an empty summary for a catalog.
    #[must_use]
    pub const fn new(catalog_id: CatalogId) -> Self {
        Self {
            catalog_id,
            selected: 0,
            published: 0,
            hidden: 0,
            failed: 0,
            synced: 0,
            unchanged: 0,
            sync_errors: 0,
            error: None,
        }
    }
}

/// Outcome counters for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Per-catalog summaries in configuration order.
    pub catalogs: Vec<CatalogRunSummary>,
}

impl RunSummary {
    /// Returns the summary for a catalog, if it ran.
    #[must_use]
    pub fn catalog(&self, catalog_id: &CatalogId) -> Option<&CatalogRunSummary> {
        self.catalogs.iter().find(|summary| &summary.catalog_id == catalog_id)
    }

    /// Returns true when no catalog failed and no record failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.catalogs.iter().all(|summary| {
            summary.error.is_none() && summary.failed == 0 && summary.sync_errors == 0
        })
    }
}
