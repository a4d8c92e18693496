// crates/catalog-publish-registry/src/lib.rs
// ============================================================================
// Module: Catalog Publish Registry Library
// Description: DataCite REST client for DOI registration.
// Purpose: Publish, delete, and hide DOIs with bounded network behavior.
// Dependencies: catalog-publish-core, reqwest, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `catalog-publish-registry` implements the core `RegistryClient` capability
//! against the `DataCite` REST API. Requests are blocking with a hard timeout,
//! redirects are disabled, and response bodies are read under a size limit.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod datacite;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use datacite::DataCiteClient;
pub use datacite::DataCiteClientError;
pub use datacite::DataCiteConfig;
pub use datacite::publish_document;
