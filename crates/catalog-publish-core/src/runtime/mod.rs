// crates/catalog-publish-core/src/runtime/mod.rs
// ============================================================================
// Module: Catalog Publish Runtime
// Description: Projector, selector, evaluator, synchronizer, and orchestrator.
// Purpose: Execute publish passes against the core interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the publication pipeline. Every host (CLI, tests,
//! scheduled jobs) drives the same [`Publisher`] so decisions stay identical
//! regardless of entry point.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod clock;
pub mod evaluator;
pub mod projector;
pub mod publisher;
pub mod selector;
pub mod store;
pub mod synchronizer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::PublishAuditEvent;
pub use audit::PublishAuditSink;
pub use audit::StderrAuditSink;
pub use clock::FixedClock;
pub use clock::SystemClock;
pub use evaluator::EvaluationError;
pub use evaluator::Evaluator;
pub use evaluator::publish_document;
pub use projector::project;
pub use publisher::CatalogTarget;
pub use publisher::DEFAULT_BATCH_SIZE;
pub use publisher::DEFAULT_MAX_RETRIES;
pub use publisher::Publisher;
pub use publisher::PublisherConfig;
pub use publisher::PublisherError;
pub use publisher::SharedRegistryClient;
pub use selector::SelectionError;
pub use selector::select_stale;
pub use selector::stale_records;
pub use store::InMemoryPublicationStore;
pub use synchronizer::SyncAction;
pub use synchronizer::SyncOutcome;
pub use synchronizer::Synchronizer;
