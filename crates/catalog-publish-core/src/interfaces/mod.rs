// crates/catalog-publish-core/src/interfaces/mod.rs
// ============================================================================
// Module: Catalog Publish Interfaces
// Description: Backend-agnostic contracts for storage, schemas, and registries.
// Purpose: Define the collaborator surfaces consumed by the publish runtime.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The runtime reaches the relational store, the schema catalog, the external
//! registry, and the wall clock only through these traits. Implementations
//! live in sibling crates (`SQLite` store, JSON-Schema catalog, `DataCite`
//! client) or in [`crate::runtime`] for in-memory testing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::Catalog;
use crate::core::CatalogId;
use crate::core::CatalogRecord;
use crate::core::CatalogRecordUpdate;
use crate::core::Doi;
use crate::core::RecordId;
use crate::core::RecordSnapshot;
use crate::core::RecordWatermarkRow;
use crate::core::RegistryPayload;
use crate::core::SchemaUri;
use crate::core::SyncCandidate;
use crate::core::SyncRecord;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Publication store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("publication store io error: {0}")]
    Io(String),
    /// Store data is corrupted or violates a row invariant.
    #[error("publication store corruption: {0}")]
    Corrupt(String),
    /// Store schema version is incompatible.
    #[error("publication store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("publication store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("publication store error: {0}")]
    Store(String),
}

/// Read access to records, tags, and catalogs owned by the registry.
pub trait RecordSource {
    /// Loads a catalog row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn catalog(&self, catalog_id: &CatalogId) -> Result<Option<Catalog>, StoreError>;

    /// Returns the aggregated timestamp sources of every record, relative to
    /// the catalog, ordered by record id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the aggregate query fails.
    fn record_watermarks(
        &self,
        catalog_id: &CatalogId,
    ) -> Result<Vec<RecordWatermarkRow>, StoreError>;

    /// Loads a record joined with its tags and its collection's tags.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn record_snapshot(&self, record_id: &RecordId) -> Result<Option<RecordSnapshot>, StoreError>;
}

/// Durable cache of publish decisions and registry sync bookkeeping.
///
/// # Invariants
/// - Every write is its own transaction.
/// - Implementations are the sole writers of catalog record and sync rows.
pub trait CatalogRecordStore {
    /// Inserts or replaces the decision for `(catalog_id, record_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails; nothing is persisted.
    fn upsert_catalog_record(&self, update: &CatalogRecordUpdate) -> Result<(), StoreError>;

    /// Loads the decision for a pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails or the row is corrupt.
    fn catalog_record(
        &self,
        catalog_id: &CatalogId,
        record_id: &RecordId,
    ) -> Result<Option<CatalogRecord>, StoreError>;

    /// Lists decisions whose watermark is strictly newer than `since`, ordered
    /// by record id. `None` lists every decision of the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn catalog_records_changed_since(
        &self,
        catalog_id: &CatalogId,
        since: Option<Timestamp>,
    ) -> Result<Vec<CatalogRecord>, StoreError>;

    /// Lists up to `limit` decisions eligible for registry sync, ordered by
    /// record id. See [`crate::core::is_sync_eligible`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn sync_candidates(
        &self,
        catalog_id: &CatalogId,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<SyncCandidate>, StoreError>;

    /// Inserts or replaces a sync row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails; nothing is persisted.
    fn save_sync_record(&self, record: &SyncRecord) -> Result<(), StoreError>;

    /// Loads the sync row for a pair.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn sync_record(
        &self,
        catalog_id: &CatalogId,
        record_id: &RecordId,
    ) -> Result<Option<SyncRecord>, StoreError>;
}

// ============================================================================
// SECTION: Schema Catalog
// ============================================================================

/// Output format requested from a schema evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Compact pass/fail annotation.
    Flag,
    /// Pass/fail plus every violated rule.
    Detailed,
}

impl OutputMode {
    /// Returns the mode label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Detailed => "detailed",
        }
    }
}

/// Single violated schema rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Human-readable violation message.
    pub message: String,
    /// JSON pointer to the offending value in the document.
    pub instance_path: String,
    /// JSON pointer to the violated keyword in the schema.
    pub schema_path: String,
}

impl SchemaViolation {
    /// Creates a violation anchored at the document root.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            instance_path: String::new(),
            schema_path: String::new(),
        }
    }
}

/// Result of evaluating a document against a publication schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEvaluation {
    /// Violations, empty when the document is valid.
    violations: Vec<SchemaViolation>,
}

impl SchemaEvaluation {
    /// Creates an evaluation from collected violations.
    #[must_use]
    pub const fn new(violations: Vec<SchemaViolation>) -> Self {
        Self {
            violations,
        }
    }

    /// Returns true when no rule was violated.
    #[must_use]
    pub const fn valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns the violations.
    #[must_use]
    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }

    /// Renders the evaluation report in the requested mode.
    #[must_use]
    pub fn output(&self, mode: OutputMode) -> Value {
        match mode {
            OutputMode::Flag => json!({ "valid": self.valid() }),
            OutputMode::Detailed => {
                let errors: Vec<Value> = self
                    .violations
                    .iter()
                    .map(|violation| {
                        json!({
                            "error": violation.message,
                            "instance_path": violation.instance_path,
                            "schema_path": violation.schema_path,
                        })
                    })
                    .collect();
                json!({ "valid": self.valid(), "errors": errors })
            }
        }
    }
}

/// Schema catalog errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No schema is registered under the URI.
    #[error("schema not found: {0}")]
    NotFound(String),
    /// The schema document failed to compile.
    #[error("schema invalid: {0}")]
    Invalid(String),
    /// The schema source could not be read.
    #[error("schema io error: {0}")]
    Io(String),
}

/// Compiled publication schema.
pub trait PublicationSchema {
    /// Evaluates a document against the schema.
    fn evaluate(&self, document: &Value) -> SchemaEvaluation;
}

/// Shared handle to a compiled schema.
pub type SharedSchema = Arc<dyn PublicationSchema + Send + Sync>;

/// Resolves schema URIs to compiled schemas.
pub trait SchemaCatalog {
    /// Resolves a schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the schema is unknown or fails to compile.
    fn get_schema(&self, uri: &SchemaUri) -> Result<SharedSchema, SchemaError>;
}

// ============================================================================
// SECTION: External Registry
// ============================================================================

/// Structured failure returned by an external registry.
///
/// `status` is `None` for transport failures and timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RegistryError {
    /// HTTP-like status code.
    pub status: Option<u16>,
    /// Error detail payload.
    pub detail: Value,
}

impl RegistryError {
    /// Creates an error with a status code.
    #[must_use]
    pub const fn status(status: u16, detail: Value) -> Self {
        Self {
            status: Some(status),
            detail,
        }
    }

    /// Creates a transport-level error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            detail: Value::String(message.into()),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "registry error {status}: {}", self.detail),
            None => write!(f, "registry transport error: {}", self.detail),
        }
    }
}

/// External DOI registry.
pub trait RegistryClient {
    /// Registers or updates a DOI as findable.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the registry rejects the request.
    fn publish(&self, payload: &RegistryPayload) -> Result<Value, RegistryError>;

    /// Deletes a DOI registration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the registry rejects the request.
    fn unpublish(&self, doi: &Doi) -> Result<(), RegistryError>;

    /// Demotes a findable DOI that can no longer be deleted.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the registry rejects the request.
    fn hide(&self, doi: &Doi) -> Result<(), RegistryError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of "now" for sync stamps.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}
