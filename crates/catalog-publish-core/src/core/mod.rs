// crates/catalog-publish-core/src/core/mod.rs
// ============================================================================
// Module: Catalog Publish Core Types
// Description: Records, catalogs, decisions, and sync bookkeeping structures.
// Purpose: Provide stable, serializable types shared by every pipeline stage.
// Dependencies: serde, serde_json, serde_jcs, sha2, time
// ============================================================================

//! ## Overview
//! Core types describe the read-only record state consumed by the pipeline and
//! the two row kinds it owns: catalog records (publish decisions) and sync
//! records (external registry bookkeeping).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod catalog;
pub mod hashing;
pub mod identifiers;
pub mod record;
pub mod summary;
pub mod sync;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::Catalog;
pub use catalog::CatalogDefinition;
pub use catalog::CatalogRecord;
pub use catalog::CatalogRecordUpdate;
pub use catalog::Decision;
pub use catalog::Projection;
pub use catalog::RecordWatermark;
pub use catalog::RecordWatermarkRow;
pub use catalog::StaleRecord;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashError;
pub use hashing::SnapshotDigest;
pub use identifiers::CatalogId;
pub use identifiers::CollectionId;
pub use identifiers::Doi;
pub use identifiers::RecordId;
pub use identifiers::SchemaId;
pub use identifiers::SchemaUri;
pub use identifiers::TagId;
pub use identifiers::UserId;
pub use record::Record;
pub use record::RecordSnapshot;
pub use record::RecordView;
pub use record::TagCardinality;
pub use record::TagInstance;
pub use record::TagView;
pub use summary::CatalogRunSummary;
pub use summary::RunSummary;
pub use sync::RegistryPayload;
pub use sync::SyncCandidate;
pub use sync::SyncRecord;
pub use sync::SyncState;
pub use sync::is_sync_eligible;
pub use time::Timestamp;
