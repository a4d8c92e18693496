// crates/catalog-publish-schema/src/catalog.rs
// ============================================================================
// Module: JSON Schema Catalog
// Description: Registry of publication schemas keyed by schema URI.
// Purpose: Resolve catalog schema URIs to compiled, shareable validators.
// Dependencies: catalog-publish-core, jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Schemas are registered up front, either as JSON documents or as file
//! paths, and compiled lazily the first time a catalog asks for them. Compiled
//! validators are cached for the life of the catalog so a publish pass over
//! many records compiles each schema at most once.
//!
//! Schemas are compiled as draft 2020-12 and must be self-contained.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use catalog_publish_core::PublicationSchema;
use catalog_publish_core::SchemaCatalog;
use catalog_publish_core::SchemaError;
use catalog_publish_core::SchemaEvaluation;
use catalog_publish_core::SchemaUri;
use catalog_publish_core::SchemaViolation;
use catalog_publish_core::SharedSchema;
use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum schema file size in bytes.
pub const MAX_SCHEMA_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema catalog registration and compilation errors.
#[derive(Debug, Error)]
pub enum JsonSchemaCatalogError {
    /// A schema is already registered under the URI.
    #[error("schema already registered: {0}")]
    Duplicate(String),
    /// No schema is registered under the URI.
    #[error("schema not found: {0}")]
    NotFound(String),
    /// Schema file could not be read.
    #[error("schema io error: {0}")]
    Io(String),
    /// Schema file is not valid JSON.
    #[error("schema parse error: {0}")]
    Parse(String),
    /// Schema document failed to compile.
    #[error("schema compile error: {0}")]
    Compile(String),
}

impl From<JsonSchemaCatalogError> for SchemaError {
    fn from(error: JsonSchemaCatalogError) -> Self {
        match error {
            JsonSchemaCatalogError::NotFound(uri) => Self::NotFound(uri),
            JsonSchemaCatalogError::Io(message) => Self::Io(message),
            JsonSchemaCatalogError::Duplicate(message)
            | JsonSchemaCatalogError::Parse(message)
            | JsonSchemaCatalogError::Compile(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Compiled Schema
// ============================================================================

/// Compiled JSON Schema bound to its URI.
pub struct CompiledSchema {
    /// URI the schema was registered under.
    uri: SchemaUri,
    /// Draft 2020-12 validator.
    validator: Validator,
}

impl CompiledSchema {
    /// Compiles a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`JsonSchemaCatalogError::Compile`] when the document is not a
    /// valid schema.
    pub fn compile(uri: SchemaUri, schema: &Value) -> Result<Self, JsonSchemaCatalogError> {
        let validator =
            jsonschema::options().with_draft(Draft::Draft202012).build(schema).map_err(|err| {
                JsonSchemaCatalogError::Compile(format!("{uri}: {err}"))
            })?;
        Ok(Self {
            uri,
            validator,
        })
    }

    /// Returns the schema URI.
    #[must_use]
    pub const fn uri(&self) -> &SchemaUri {
        &self.uri
    }
}

impl PublicationSchema for CompiledSchema {
    fn evaluate(&self, document: &Value) -> SchemaEvaluation {
        let violations = self
            .validator
            .iter_errors(document)
            .map(|err| SchemaViolation {
                message: err.to_string(),
                instance_path: err.instance_path().to_string(),
                schema_path: err.schema_path().to_string(),
            })
            .collect();
        SchemaEvaluation::new(violations)
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Where a registered schema comes from.
#[derive(Debug, Clone)]
enum SchemaSource {
    /// In-memory schema document.
    Document(Value),
    /// Schema document on disk, read at first use.
    File(PathBuf),
}

/// Schema catalog backed by draft 2020-12 JSON Schemas.
#[derive(Default)]
pub struct JsonSchemaCatalog {
    /// Registered sources keyed by URI.
    sources: BTreeMap<SchemaUri, SchemaSource>,
    /// Compiled validators keyed by URI.
    compiled: Mutex<BTreeMap<SchemaUri, SharedSchema>>,
}

impl JsonSchemaCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an in-memory schema document.
    ///
    /// # Errors
    ///
    /// Returns [`JsonSchemaCatalogError::Duplicate`] when the URI is taken.
    pub fn register(
        &mut self,
        uri: SchemaUri,
        schema: Value,
    ) -> Result<(), JsonSchemaCatalogError> {
        self.insert(uri, SchemaSource::Document(schema))
    }

    /// Registers a schema file, read and compiled on first use.
    ///
    /// # Errors
    ///
    /// Returns [`JsonSchemaCatalogError::Duplicate`] when the URI is taken.
    pub fn register_file(
        &mut self,
        uri: SchemaUri,
        path: impl Into<PathBuf>,
    ) -> Result<(), JsonSchemaCatalogError> {
        self.insert(uri, SchemaSource::File(path.into()))
    }

    /// Returns true when a schema is registered under `uri`.
    #[must_use]
    pub fn contains(&self, uri: &SchemaUri) -> bool {
        self.sources.contains_key(uri)
    }

    /// Returns the registered URIs in order.
    pub fn uris(&self) -> impl Iterator<Item = &SchemaUri> {
        self.sources.keys()
    }

    /// Compiles every registered schema, failing on the first error.
    ///
    /// # Errors
    ///
    /// Returns [`JsonSchemaCatalogError`] when a schema cannot be loaded or
    /// compiled.
    pub fn preload(&self) -> Result<(), JsonSchemaCatalogError> {
        for uri in self.sources.keys() {
            self.resolve(uri)?;
        }
        Ok(())
    }

    /// Adds a source, rejecting duplicates.
    fn insert(&mut self, uri: SchemaUri, source: SchemaSource) -> Result<(), JsonSchemaCatalogError> {
        if self.sources.contains_key(&uri) {
            return Err(JsonSchemaCatalogError::Duplicate(uri.to_string()));
        }
        self.sources.insert(uri, source);
        Ok(())
    }

    /// Returns the cached validator for `uri`, compiling it on first use.
    fn resolve(&self, uri: &SchemaUri) -> Result<SharedSchema, JsonSchemaCatalogError> {
        let mut compiled = self
            .compiled
            .lock()
            .map_err(|_| JsonSchemaCatalogError::Compile("schema cache poisoned".to_string()))?;
        if let Some(existing) = compiled.get(uri) {
            return Ok(Arc::clone(existing));
        }
        let source = self
            .sources
            .get(uri)
            .ok_or_else(|| JsonSchemaCatalogError::NotFound(uri.to_string()))?;
        let document = match source {
            SchemaSource::Document(value) => value.clone(),
            SchemaSource::File(path) => read_schema_file(path)?,
        };
        let schema: SharedSchema = Arc::new(CompiledSchema::compile(uri.clone(), &document)?);
        compiled.insert(uri.clone(), Arc::clone(&schema));
        drop(compiled);
        Ok(schema)
    }
}

impl SchemaCatalog for JsonSchemaCatalog {
    fn get_schema(&self, uri: &SchemaUri) -> Result<SharedSchema, SchemaError> {
        Ok(self.resolve(uri)?)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a schema file with a size limit.
fn read_schema_file(path: &Path) -> Result<Value, JsonSchemaCatalogError> {
    let bytes = fs::read(path)
        .map_err(|err| JsonSchemaCatalogError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_SCHEMA_FILE_SIZE {
        return Err(JsonSchemaCatalogError::Io(format!(
            "{}: schema file exceeds size limit",
            path.display()
        )));
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| JsonSchemaCatalogError::Parse(format!("{}: {err}", path.display())))
}
