// crates/catalog-publish-cli/src/wiring.rs
// ============================================================================
// Module: Publisher Wiring
// Description: Constructs runtime collaborators from configuration.
// Purpose: Turn a validated config into a runnable publisher.
// Dependencies: catalog-publish-config, catalog-publish-core, catalog-publish-registry, catalog-publish-schema, catalog-publish-store-sqlite
// ============================================================================

//! ## Overview
//! Everything here runs before the first record is touched, so any failure
//! aborts the run with a single message instead of a partial pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use catalog_publish_config::CatalogPublishConfig;
use catalog_publish_core::CatalogId;
use catalog_publish_core::CatalogTarget;
use catalog_publish_core::FileAuditSink;
use catalog_publish_core::NoopAuditSink;
use catalog_publish_core::PublishAuditSink;
use catalog_publish_core::Publisher;
use catalog_publish_core::RunSummary;
use catalog_publish_core::SharedRegistryClient;
use catalog_publish_core::StderrAuditSink;
use catalog_publish_core::SystemClock;
use catalog_publish_registry::DataCiteClient;
use catalog_publish_schema::JsonSchemaCatalog;
use catalog_publish_store_sqlite::SqlitePublicationStore;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a display-ready message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    #[must_use]
    pub const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Publisher over the durable store and file-backed schemas.
pub type ConfiguredPublisher = Publisher<SqlitePublicationStore, JsonSchemaCatalog>;

/// Registers and compiles every configured schema.
///
/// # Errors
///
/// Returns [`CliError`] when a schema is duplicated, unreadable, or invalid.
pub fn build_schema_catalog(config: &CatalogPublishConfig) -> CliResult<JsonSchemaCatalog> {
    let mut catalog = JsonSchemaCatalog::new();
    for schema in &config.schemas {
        catalog
            .register_file(schema.uri.clone(), schema.path())
            .map_err(|err| CliError::new(err.to_string()))?;
    }
    catalog.preload().map_err(|err| CliError::new(err.to_string()))?;
    Ok(catalog)
}

/// Builds the configured audit sink.
///
/// # Errors
///
/// Returns [`CliError`] when the audit log cannot be opened.
pub fn build_audit_sink(config: &CatalogPublishConfig) -> CliResult<Arc<dyn PublishAuditSink>> {
    if !config.audit.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.audit.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path.trim()))
                .map_err(|err| CliError::new(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Builds catalog targets, creating one registry client per mirrored catalog.
///
/// # Errors
///
/// Returns [`CliError`] when a registry password or client cannot be set up.
pub fn build_targets(config: &CatalogPublishConfig) -> CliResult<Vec<CatalogTarget>> {
    config
        .catalogs
        .iter()
        .map(|catalog| {
            let definition = catalog.definition();
            let Some(registry) = &catalog.registry else {
                return Ok(CatalogTarget::local(definition));
            };
            let client_config =
                registry.to_datacite_config().map_err(|err| CliError::new(err.to_string()))?;
            let client = DataCiteClient::new(&client_config)
                .map_err(|err| CliError::new(format!("catalog {}: {err}", catalog.id)))?;
            let client: SharedRegistryClient = Arc::new(client);
            Ok(CatalogTarget::with_registry(definition, client))
        })
        .collect()
}

/// Builds a publisher from a validated configuration.
///
/// # Errors
///
/// Returns [`CliError`] when any collaborator cannot be constructed.
pub fn build_publisher(config: &CatalogPublishConfig) -> CliResult<ConfiguredPublisher> {
    let store = SqlitePublicationStore::new(&config.store)
        .map_err(|err| CliError::new(err.to_string()))?;
    let schemas = build_schema_catalog(config)?;
    let audit = build_audit_sink(config)?;
    let targets = build_targets(config)?;
    Publisher::new(
        store,
        schemas,
        Arc::new(SystemClock),
        audit,
        targets,
        config.publisher_config(),
    )
    .map_err(|err| CliError::new(err.to_string()))
}

/// Runs one publish pass over every catalog, or just `catalog` when given.
///
/// # Errors
///
/// Returns [`CliError`] when wiring fails or `catalog` is not configured.
pub fn run_publish(
    config: &CatalogPublishConfig,
    catalog: Option<&CatalogId>,
) -> CliResult<RunSummary> {
    let publisher = build_publisher(config)?;
    match catalog {
        None => Ok(publisher.run()),
        Some(catalog_id) => {
            let summary = publisher
                .run_catalog(catalog_id)
                .ok_or_else(|| CliError::new(format!("catalog not configured: {catalog_id}")))?;
            Ok(RunSummary {
                catalogs: vec![summary],
            })
        }
    }
}

/// Checks that every schema compiles and every registry client can be built.
///
/// # Errors
///
/// Returns [`CliError`] describing the first problem found.
pub fn check_config(config: &CatalogPublishConfig) -> CliResult<()> {
    build_schema_catalog(config)?;
    build_targets(config)?;
    Ok(())
}
