// crates/catalog-publish-schema/src/lib.rs
// ============================================================================
// Module: Catalog Publish Schema Library
// Description: JSON-Schema backed publication schema catalog.
// Purpose: Compile catalog schemas once and evaluate projected records.
// Dependencies: catalog-publish-core, jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `catalog-publish-schema` implements the core `SchemaCatalog` capability
//! with draft 2020-12 JSON Schemas. Schemas are registered in memory or
//! loaded from files, compiled on first use, and shared afterwards.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::CompiledSchema;
pub use catalog::JsonSchemaCatalog;
pub use catalog::JsonSchemaCatalogError;
pub use catalog::MAX_SCHEMA_FILE_SIZE;
