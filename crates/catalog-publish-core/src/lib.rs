// crates/catalog-publish-core/src/lib.rs
// ============================================================================
// Module: Catalog Publish Core Library
// Description: Public API surface for the catalog publication pipeline.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Catalog publish core decides, for every (catalog, record) pair, whether the
//! record is visible in the catalog, persists that decision idempotently, and
//! reconciles DOI-backed catalogs with an external registry. It is
//! backend-agnostic and reaches storage, schemas, and registries only through
//! the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::CatalogRecordStore;
pub use interfaces::Clock;
pub use interfaces::OutputMode;
pub use interfaces::PublicationSchema;
pub use interfaces::RecordSource;
pub use interfaces::RegistryClient;
pub use interfaces::RegistryError;
pub use interfaces::SchemaCatalog;
pub use interfaces::SchemaError;
pub use interfaces::SchemaEvaluation;
pub use interfaces::SchemaViolation;
pub use interfaces::SharedSchema;
pub use interfaces::StoreError;
pub use runtime::CatalogTarget;
pub use runtime::DEFAULT_BATCH_SIZE;
pub use runtime::DEFAULT_MAX_RETRIES;
pub use runtime::EvaluationError;
pub use runtime::Evaluator;
pub use runtime::FileAuditSink;
pub use runtime::FixedClock;
pub use runtime::InMemoryPublicationStore;
pub use runtime::NoopAuditSink;
pub use runtime::PublishAuditEvent;
pub use runtime::PublishAuditSink;
pub use runtime::Publisher;
pub use runtime::PublisherConfig;
pub use runtime::PublisherError;
pub use runtime::SelectionError;
pub use runtime::SharedRegistryClient;
pub use runtime::StderrAuditSink;
pub use runtime::SyncAction;
pub use runtime::SyncOutcome;
pub use runtime::Synchronizer;
pub use runtime::SystemClock;
pub use runtime::project;
pub use runtime::publish_document;
pub use runtime::select_stale;
pub use runtime::stale_records;
