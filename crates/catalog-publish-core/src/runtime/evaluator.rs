// crates/catalog-publish-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Catalog Record Evaluator
// Description: Schema-driven publish/hide decisions and published documents.
// Purpose: Turn a projected record into an immutable catalog record update.
// Dependencies: crate::{core, interfaces}, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The evaluator validates a [`RecordView`] against the catalog's publication
//! schema. A valid record is published with a `flag` report and a document
//! shaped by the catalog's [`Projection`]; an invalid one is hidden with the
//! `detailed` report. Schema failure is a decision, not an error.
//!
//! Every update carries the selector's `latest` timestamp as its watermark,
//! whatever the outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::CatalogDefinition;
use crate::core::CatalogRecordUpdate;
use crate::core::Decision;
use crate::core::Projection;
use crate::core::RecordId;
use crate::core::RecordSnapshot;
use crate::core::RecordView;
use crate::core::StaleRecord;
use crate::core::TagView;
use crate::interfaces::OutputMode;
use crate::interfaces::SchemaEvaluation;
use crate::interfaces::SchemaViolation;
use crate::interfaces::SharedSchema;
use crate::interfaces::StoreError;
use crate::runtime::projector::project;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that prevent a record from being evaluated.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The selected record no longer exists.
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),
    /// The projected document could not be serialized.
    #[error("record projection failed: {0}")]
    Projection(String),
    /// Reading the record snapshot failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// Evaluates records for one catalog against its compiled schema.
pub struct Evaluator {
    /// Catalog being evaluated.
    definition: CatalogDefinition,
    /// Compiled publication schema.
    schema: SharedSchema,
}

impl Evaluator {
    /// Creates an evaluator for a catalog.
    #[must_use]
    pub fn new(definition: CatalogDefinition, schema: SharedSchema) -> Self {
        Self {
            definition,
            schema,
        }
    }

    /// Returns the catalog definition.
    #[must_use]
    pub const fn definition(&self) -> &CatalogDefinition {
        &self.definition
    }

    /// Evaluates a record snapshot selected at `stale.latest`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::Projection`] when the record document cannot
    /// be serialized for schema evaluation.
    pub fn evaluate(
        &self,
        snapshot: &RecordSnapshot,
        stale: &StaleRecord,
    ) -> Result<CatalogRecordUpdate, EvaluationError> {
        let view = project(snapshot);
        let document =
            serde_json::to_value(&view).map_err(|err| EvaluationError::Projection(err.to_string()))?;
        let evaluation = self.schema.evaluate(&document);
        let (validity, decision) = if evaluation.valid() {
            match publish_document(&self.definition.projection, &view) {
                Some(published_record) => (
                    evaluation.output(OutputMode::Flag),
                    Decision::Published {
                        published_record,
                    },
                ),
                None => (missing_identifier_report(&self.definition.projection), Decision::Hidden),
            }
        } else {
            (evaluation.output(OutputMode::Detailed), Decision::Hidden)
        };
        Ok(CatalogRecordUpdate {
            catalog_id: self.definition.id.clone(),
            record_id: view.id,
            validity,
            decision,
            timestamp: stale.latest,
        })
    }
}

// ============================================================================
// SECTION: Published Documents
// ============================================================================

/// Builds the published document for a projection.
///
/// Returns `None` when the projection requires an identifier the record lacks.
#[must_use]
pub fn publish_document(projection: &Projection, view: &RecordView) -> Option<Value> {
    match projection {
        Projection::Native => Some(native_document(view)),
        Projection::DataCite {
            landing_base_url,
        } => datacite_document(landing_base_url, view),
    }
}

/// Native shape: identifiers, metadata, and public tags without user data.
///
/// The record's own timestamp stays out; the catalog row carries the watermark.
fn native_document(view: &RecordView) -> Value {
    json!({
        "id": view.id,
        "doi": view.doi,
        "sid": view.sid,
        "collection_id": view.collection_id,
        "schema_id": view.schema_id,
        "metadata": view.metadata,
        "tags": public_tags(&view.tags),
        "collection_tags": public_tags(&view.collection_tags),
    })
}

/// DOI registry shape: DOI, landing page, and registry metadata.
fn datacite_document(landing_base_url: &str, view: &RecordView) -> Option<Value> {
    let doi = view.doi.as_ref()?;
    let url = format!("{}/{}", landing_base_url.trim_end_matches('/'), doi.as_str());
    let mut metadata = match &view.metadata {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    metadata.remove("doi");
    metadata.remove("url");
    Some(json!({
        "doi": doi,
        "url": url,
        "metadata": Value::Object(metadata),
    }))
}

/// Keeps public tags and drops owning-user details.
fn public_tags(tags: &[TagView]) -> Vec<Value> {
    tags.iter()
        .filter(|tag| tag.public)
        .map(|tag| {
            json!({
                "tag_id": tag.tag_id,
                "data": tag.data,
                "timestamp": tag.timestamp,
                "cardinality": tag.cardinality,
            })
        })
        .collect()
}

/// Detailed report for a schema-valid record the projection cannot publish.
fn missing_identifier_report(projection: &Projection) -> Value {
    let message = match projection {
        Projection::DataCite {
            ..
        } => "record has no DOI",
        Projection::Native => "record is missing a required identifier",
    };
    SchemaEvaluation::new(vec![SchemaViolation::new(message)])
    .output(OutputMode::Detailed)
}
