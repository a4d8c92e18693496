// crates/catalog-publish-core/src/core/catalog.rs
// ============================================================================
// Module: Catalogs and Catalog Records
// Description: Catalog definitions, publish decisions, and watermark rows.
// Purpose: Model the durable per-(catalog, record) publication decision.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Catalog`] is the store-side entity (schema reference and schema
//! timestamp); a [`CatalogDefinition`] is the configured publication target
//! (which projection shapes its published records). Each evaluation produces
//! an immutable [`CatalogRecordUpdate`]; the store persists it as a
//! [`CatalogRecord`].
//!
//! Invariants:
//! - `published` holds exactly when a published record document exists. The
//!   [`Decision`] enum makes the opposite state unrepresentable.
//! - The watermark `timestamp` is the latest contributing source timestamp
//!   accounted for by the decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CatalogId;
use crate::core::identifiers::RecordId;
use crate::core::identifiers::SchemaUri;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Catalog Entities
// ============================================================================

/// Catalog row as held by the relational store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog identifier.
    pub id: CatalogId,
    /// Publication schema reference, if configured.
    pub schema_uri: Option<SchemaUri>,
    /// Last-modified timestamp of the publication schema.
    pub schema_timestamp: Timestamp,
}

/// Published-record shape produced for a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    /// Native registry shape: identifiers, metadata, and public tags.
    Native,
    /// DOI registry shape: DOI, landing page URL, and registry metadata.
    DataCite {
        /// Base URL for DOI landing pages; the DOI is appended as a path segment.
        landing_base_url: String,
    },
}

/// Configured publication target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDefinition {
    /// Catalog identifier.
    pub id: CatalogId,
    /// Published-record projection.
    pub projection: Projection,
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Publish or hide outcome for a (catalog, record) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Decision {
    /// The record is visible in the catalog with the given representation.
    Published {
        /// Externally visible projection of the record.
        published_record: Value,
    },
    /// The record is hidden from the catalog.
    Hidden,
}

impl Decision {
    /// Returns true when the record is published.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }

    /// Returns the published record document, if any.
    #[must_use]
    pub const fn published_record(&self) -> Option<&Value> {
        match self {
            Self::Published {
                published_record,
            } => Some(published_record),
            Self::Hidden => None,
        }
    }

    /// Rebuilds a decision from its persisted columns.
    ///
    /// Returns `None` when the columns disagree, i.e. the row is corrupt.
    #[must_use]
    pub fn from_columns(published: bool, published_record: Option<Value>) -> Option<Self> {
        match (published, published_record) {
            (true, Some(published_record)) => Some(Self::Published {
                published_record,
            }),
            (false, None) => Some(Self::Hidden),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Catalog Records
// ============================================================================

/// Immutable result of evaluating one record for one catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecordUpdate {
    /// Catalog identifier.
    pub catalog_id: CatalogId,
    /// Record identifier.
    pub record_id: RecordId,
    /// Schema evaluation report (`flag` output on pass, `detailed` on failure).
    pub validity: Value,
    /// Publish or hide decision.
    pub decision: Decision,
    /// Watermark: latest contributing source timestamp.
    pub timestamp: Timestamp,
}

/// Persisted publication decision for a (catalog, record) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Catalog identifier.
    pub catalog_id: CatalogId,
    /// Record identifier.
    pub record_id: RecordId,
    /// Schema evaluation report.
    pub validity: Value,
    /// Publish or hide decision.
    pub decision: Decision,
    /// Watermark.
    pub timestamp: Timestamp,
}

impl CatalogRecord {
    /// Returns true when the record is published in the catalog.
    #[must_use]
    pub const fn published(&self) -> bool {
        self.decision.is_published()
    }

    /// Returns the published record document, if any.
    #[must_use]
    pub const fn published_record(&self) -> Option<&Value> {
        self.decision.published_record()
    }
}

impl From<CatalogRecordUpdate> for CatalogRecord {
    fn from(update: CatalogRecordUpdate) -> Self {
        Self {
            catalog_id: update.catalog_id,
            record_id: update.record_id,
            validity: update.validity,
            decision: update.decision,
            timestamp: update.timestamp,
        }
    }
}

// ============================================================================
// SECTION: Watermarks
// ============================================================================

/// Aggregated timestamp sources for one record, relative to one catalog.
///
/// Produced by a single store query; `None` tag terms mean "no tags".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordWatermark {
    /// Record last-modified timestamp.
    pub record_timestamp: Timestamp,
    /// Latest record tag timestamp.
    pub latest_record_tag: Option<Timestamp>,
    /// Latest collection tag timestamp for the owning collection.
    pub latest_collection_tag: Option<Timestamp>,
    /// Stored catalog record watermark, if the pair was evaluated before.
    pub evaluated_at: Option<Timestamp>,
}

/// Record id paired with its aggregated timestamp sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordWatermarkRow {
    /// Record identifier.
    pub record_id: RecordId,
    /// Aggregated timestamps.
    pub watermark: RecordWatermark,
}

/// Record selected for (re-)evaluation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StaleRecord {
    /// Record identifier.
    pub record_id: RecordId,
    /// Latest contributing timestamp to stamp on the evaluation.
    pub latest: Timestamp,
}
