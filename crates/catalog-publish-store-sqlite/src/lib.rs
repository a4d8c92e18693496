// crates/catalog-publish-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Publication Store
// Description: Durable publication store backend using SQLite WAL.
// Purpose: Persist records, tags, catalogs, decisions, and sync bookkeeping.
// Dependencies: catalog-publish-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed implementation of both
//! [`catalog_publish_core::RecordSource`] and
//! [`catalog_publish_core::CatalogRecordStore`]. Staleness inputs come from a
//! single aggregate query, and every pipeline write runs in its own
//! transaction so one failed record never rolls back another.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqlitePublicationStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
