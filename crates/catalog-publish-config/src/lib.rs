// crates/catalog-publish-config/src/lib.rs
// ============================================================================
// Module: Catalog Publish Config Library
// Description: Configuration model and validation for catalog-publish.toml.
// Purpose: Single source of truth for publish job settings.
// Dependencies: catalog-publish-core, catalog-publish-registry, catalog-publish-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `catalog-publish-config` loads the publish job configuration from TOML
//! with strict size and path limits and validates it fail-closed before any
//! store, schema, or registry is touched.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
