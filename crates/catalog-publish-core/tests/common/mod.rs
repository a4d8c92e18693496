// crates/catalog-publish-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared records, fake schemas, scripted registry, audit capture.
// Purpose: Provide deterministic collaborators for pipeline tests.
// Dependencies: catalog-publish-core, serde_json
// ============================================================================

//! ## Overview
//! Fixtures used across the core integration tests. The fake schema checks
//! required top-level fields, the scripted registry replays queued failures,
//! and the recording sink captures audit events for assertions.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use catalog_publish_core::Catalog;
use catalog_publish_core::CatalogDefinition;
use catalog_publish_core::CatalogId;
use catalog_publish_core::CollectionId;
use catalog_publish_core::Doi;
use catalog_publish_core::InMemoryPublicationStore;
use catalog_publish_core::Projection;
use catalog_publish_core::PublicationSchema;
use catalog_publish_core::PublishAuditEvent;
use catalog_publish_core::PublishAuditSink;
use catalog_publish_core::Record;
use catalog_publish_core::RecordId;
use catalog_publish_core::RegistryClient;
use catalog_publish_core::RegistryError;
use catalog_publish_core::RegistryPayload;
use catalog_publish_core::SchemaCatalog;
use catalog_publish_core::SchemaError;
use catalog_publish_core::SchemaEvaluation;
use catalog_publish_core::SchemaId;
use catalog_publish_core::SchemaUri;
use catalog_publish_core::SchemaViolation;
use catalog_publish_core::SharedSchema;
use catalog_publish_core::TagCardinality;
use catalog_publish_core::TagId;
use catalog_publish_core::TagInstance;
use catalog_publish_core::Timestamp;
use catalog_publish_core::UserId;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Shorthand for a millisecond timestamp.
pub fn ts(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

/// Builds a record in collection `c1`.
pub fn record(id: &str, doi: Option<&str>, sid: Option<&str>, timestamp: i64) -> Record {
    Record {
        id: RecordId::new(id),
        doi: doi.map(Doi::new),
        sid: sid.map(str::to_string),
        collection_id: CollectionId::new("c1"),
        schema_id: SchemaId::new("datacite-4"),
        metadata: json!({ "titles": [{ "title": format!("Dataset {id}") }] }),
        timestamp: ts(timestamp),
    }
}

/// Builds a tag instance owned by user `u1`.
pub fn tag(tag_id: &str, timestamp: i64, public: bool) -> TagInstance {
    TagInstance {
        tag_id: TagId::new(tag_id),
        user_id: Some(UserId::new("u1")),
        user_name: Some("Ada".to_string()),
        data: json!({ "value": tag_id }),
        timestamp: ts(timestamp),
        cardinality: TagCardinality::One,
        public,
    }
}

/// Builds a catalog row bound to a schema URI.
pub fn catalog(id: &str, schema_uri: &str, schema_timestamp: i64) -> Catalog {
    Catalog {
        id: CatalogId::new(id),
        schema_uri: Some(SchemaUri::new(schema_uri)),
        schema_timestamp: ts(schema_timestamp),
    }
}

/// Native catalog definition.
pub fn native_definition(id: &str) -> CatalogDefinition {
    CatalogDefinition {
        id: CatalogId::new(id),
        projection: Projection::Native,
    }
}

/// `DataCite` catalog definition with a fixed landing base URL.
pub fn datacite_definition(id: &str) -> CatalogDefinition {
    CatalogDefinition {
        id: CatalogId::new(id),
        projection: Projection::DataCite {
            landing_base_url: "https://catalog.example.org/records/".to_string(),
        },
    }
}

/// Store seeded with the `SAEON` (sid-or-doi) and `DATACITE` (doi) catalogs.
pub fn seeded_store() -> InMemoryPublicationStore {
    let store = InMemoryPublicationStore::new();
    store.put_catalog(catalog("SAEON", "schema:sid-or-doi", 1)).unwrap();
    store.put_catalog(catalog("DATACITE", "schema:doi", 1)).unwrap();
    store
}

// ============================================================================
// SECTION: Schemas
// ============================================================================

/// Schema accepting documents where any one of `any_of` fields is non-null.
pub struct RequiredFieldSchema {
    /// Candidate field names.
    any_of: Vec<&'static str>,
}

impl RequiredFieldSchema {
    /// Creates the schema.
    pub fn new(any_of: Vec<&'static str>) -> Self {
        Self {
            any_of,
        }
    }
}

impl PublicationSchema for RequiredFieldSchema {
    fn evaluate(&self, document: &Value) -> SchemaEvaluation {
        let present = self
            .any_of
            .iter()
            .any(|field| document.get(*field).is_some_and(|value| !value.is_null()));
        if present {
            SchemaEvaluation::new(Vec::new())
        } else {
            let violations = self
                .any_of
                .iter()
                .map(|field| SchemaViolation {
                    message: format!("\"{field}\" is required"),
                    instance_path: String::new(),
                    schema_path: "/required".to_string(),
                })
                .collect();
            SchemaEvaluation::new(violations)
        }
    }
}

/// Schema catalog backed by a map.
#[derive(Default)]
pub struct FakeSchemaCatalog {
    /// Registered schemas.
    schemas: BTreeMap<String, SharedSchema>,
}

impl FakeSchemaCatalog {
    /// Catalog with the `sid-or-doi` and `doi` schemas.
    pub fn standard() -> Self {
        let mut schemas: BTreeMap<String, SharedSchema> = BTreeMap::new();
        schemas.insert(
            "schema:sid-or-doi".to_string(),
            Arc::new(RequiredFieldSchema::new(vec!["sid", "doi"])),
        );
        schemas.insert("schema:doi".to_string(), Arc::new(RequiredFieldSchema::new(vec!["doi"])));
        Self {
            schemas,
        }
    }
}

impl SchemaCatalog for FakeSchemaCatalog {
    fn get_schema(&self, uri: &SchemaUri) -> Result<SharedSchema, SchemaError> {
        self.schemas
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(uri.to_string()))
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry call observed by the scripted registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    /// Publish of a DOI.
    Publish(String),
    /// Delete of a DOI.
    Unpublish(String),
    /// Hide of a DOI.
    Hide(String),
}

/// Registry that records calls and replays queued failures.
#[derive(Default)]
pub struct ScriptedRegistry {
    /// Observed calls.
    calls: Mutex<Vec<RegistryCall>>,
    /// Failures returned by upcoming publish calls.
    publish_failures: Mutex<VecDeque<RegistryError>>,
    /// Failures returned by upcoming unpublish calls.
    unpublish_failures: Mutex<VecDeque<RegistryError>>,
}

impl ScriptedRegistry {
    /// Queues a failure for the next publish call.
    pub fn fail_next_publish(&self, error: RegistryError) {
        self.publish_failures.lock().unwrap().push_back(error);
    }

    /// Queues a failure for the next unpublish call.
    pub fn fail_next_unpublish(&self, error: RegistryError) {
        self.unpublish_failures.lock().unwrap().push_back(error);
    }

    /// Returns observed calls.
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Clears observed calls.
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl RegistryClient for ScriptedRegistry {
    fn publish(&self, payload: &RegistryPayload) -> Result<Value, RegistryError> {
        self.calls.lock().unwrap().push(RegistryCall::Publish(payload.doi.to_string()));
        match self.publish_failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(json!({ "data": { "id": payload.doi } })),
        }
    }

    fn unpublish(&self, doi: &Doi) -> Result<(), RegistryError> {
        self.calls.lock().unwrap().push(RegistryCall::Unpublish(doi.to_string()));
        match self.unpublish_failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn hide(&self, doi: &Doi) -> Result<(), RegistryError> {
        self.calls.lock().unwrap().push(RegistryCall::Hide(doi.to_string()));
        Ok(())
    }
}

/// Transient registry failure.
pub fn unavailable() -> RegistryError {
    RegistryError::status(503, json!({ "errors": [{ "title": "Service Unavailable" }] }))
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink capturing events in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Captured events.
    events: Mutex<Vec<PublishAuditEvent>>,
}

impl RecordingAuditSink {
    /// Returns captured event names in order.
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|event| event.event).collect()
    }

    /// Returns captured events.
    pub fn events(&self) -> Vec<PublishAuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PublishAuditSink for RecordingAuditSink {
    fn record(&self, event: &PublishAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
