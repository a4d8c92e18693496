// crates/catalog-publish-cli/src/lib.rs
// ============================================================================
// Module: Catalog Publish CLI Library
// Description: Wiring from configuration to a ready publisher.
// Purpose: Keep the binary thin and the wiring testable.
// Dependencies: catalog-publish-config, catalog-publish-core, catalog-publish-registry, catalog-publish-schema, catalog-publish-store-sqlite
// ============================================================================

//! ## Overview
//! Builds the `SQLite` store, the JSON-Schema catalog, the audit sink, and
//! one `DataCite` client per mirrored catalog from a validated config, and
//! hands them to the core publisher.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod wiring;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use wiring::CliError;
pub use wiring::CliResult;
pub use wiring::ConfiguredPublisher;
pub use wiring::build_publisher;
pub use wiring::check_config;
pub use wiring::run_publish;
