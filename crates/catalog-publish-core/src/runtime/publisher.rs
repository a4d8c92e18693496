// crates/catalog-publish-core/src/runtime/publisher.rs
// ============================================================================
// Module: Publisher Orchestrator
// Description: Per-catalog selection, evaluation, persistence, and sync passes.
// Purpose: Run one batch publish pass over every configured catalog.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! A [`Publisher`] walks its catalogs in configuration order. For each one it
//! selects stale records, evaluates and persists them one at a time, then runs
//! a registry sync pass when the catalog has a registry client. Each record is
//! an independent unit: a failure is counted and audited and the pass moves
//! on. A catalog-level failure ends that catalog's pass only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::core::CatalogDefinition;
use crate::core::CatalogId;
use crate::core::CatalogRecordUpdate;
use crate::core::CatalogRunSummary;
use crate::core::RunSummary;
use crate::core::StaleRecord;
use crate::interfaces::CatalogRecordStore;
use crate::interfaces::Clock;
use crate::interfaces::RecordSource;
use crate::interfaces::RegistryClient;
use crate::interfaces::SchemaCatalog;
use crate::interfaces::SchemaError;
use crate::interfaces::StoreError;
use crate::runtime::audit::PublishAuditEvent;
use crate::runtime::audit::PublishAuditSink;
use crate::runtime::evaluator::EvaluationError;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::selector::SelectionError;
use crate::runtime::selector::load_catalog;
use crate::runtime::selector::select_stale;
use crate::runtime::synchronizer::SyncAction;
use crate::runtime::synchronizer::SyncOutcome;
use crate::runtime::synchronizer::Synchronizer;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default cap on sync candidates per catalog per run.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Default consecutive sync failures tolerated before exhaustion.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Run-wide publisher limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Maximum registry sync candidates per catalog per run.
    pub batch_size: usize,
    /// Consecutive sync failures tolerated before a record is excluded.
    pub max_retries: u32,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Shared registry client handle.
pub type SharedRegistryClient = Arc<dyn RegistryClient + Send + Sync>;

/// Catalog processed by the publisher.
#[derive(Clone)]
pub struct CatalogTarget {
    /// Catalog definition.
    pub definition: CatalogDefinition,
    /// External registry, when the catalog is mirrored to one.
    pub registry: Option<SharedRegistryClient>,
}

impl CatalogTarget {
    /// Creates a target without an external registry.
    #[must_use]
    pub const fn local(definition: CatalogDefinition) -> Self {
        Self {
            definition,
            registry: None,
        }
    }

    /// Creates a target mirrored to an external registry.
    #[must_use]
    pub fn with_registry(definition: CatalogDefinition, registry: SharedRegistryClient) -> Self {
        Self {
            definition,
            registry: Some(registry),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by the publisher.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// Publisher configuration is invalid.
    #[error("invalid publisher configuration: {0}")]
    InvalidConfig(String),
    /// Catalog selection failed.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// The catalog's publication schema could not be resolved.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A catalog-level store query failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Publisher
// ============================================================================

/// Batch publish orchestrator.
pub struct Publisher<S, C> {
    /// Relational store.
    store: S,
    /// Publication schema catalog.
    schemas: C,
    /// Source of sync attempt timestamps.
    clock: Arc<dyn Clock + Send + Sync>,
    /// Audit sink.
    audit: Arc<dyn PublishAuditSink>,
    /// Catalogs in processing order.
    targets: Vec<CatalogTarget>,
    /// Run-wide limits.
    config: PublisherConfig,
}

impl<S, C> Publisher<S, C>
where
    S: RecordSource + CatalogRecordStore,
    C: SchemaCatalog,
{
    /// Creates a publisher.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidConfig`] when limits are zero or a
    /// catalog is listed twice.
    pub fn new(
        store: S,
        schemas: C,
        clock: Arc<dyn Clock + Send + Sync>,
        audit: Arc<dyn PublishAuditSink>,
        targets: Vec<CatalogTarget>,
        config: PublisherConfig,
    ) -> Result<Self, PublisherError> {
        if config.batch_size == 0 {
            return Err(PublisherError::InvalidConfig(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if config.max_retries == 0 {
            return Err(PublisherError::InvalidConfig(
                "max_retries must be greater than zero".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for target in &targets {
            if !seen.insert(target.definition.id.clone()) {
                return Err(PublisherError::InvalidConfig(format!(
                    "catalog listed twice: {}",
                    target.definition.id
                )));
            }
        }
        Ok(Self {
            store,
            schemas,
            clock,
            audit,
            targets,
            config,
        })
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the configured catalogs.
    #[must_use]
    pub fn targets(&self) -> &[CatalogTarget] {
        &self.targets
    }

    /// Runs one publish pass over every catalog.
    #[must_use]
    pub fn run(&self) -> RunSummary {
        let catalogs = self.targets.iter().map(|target| self.run_target(target)).collect();
        RunSummary {
            catalogs,
        }
    }

    /// Runs one publish pass over a single configured catalog.
    ///
    /// Returns `None` when the catalog is not configured.
    #[must_use]
    pub fn run_catalog(&self, catalog_id: &CatalogId) -> Option<CatalogRunSummary> {
        self.targets
            .iter()
            .find(|target| &target.definition.id == catalog_id)
            .map(|target| self.run_target(target))
    }

    /// Runs a target and emits its summary.
    fn run_target(&self, target: &CatalogTarget) -> CatalogRunSummary {
        let mut summary = CatalogRunSummary::new(target.definition.id.clone());
        if let Err(err) = self.process_catalog(target, &mut summary) {
            let message = err.to_string();
            self.audit
                .record(&PublishAuditEvent::catalog_failed(&target.definition.id, message.clone()));
            summary.error = Some(message);
        }
        self.audit.record(&PublishAuditEvent::catalog_summary(&summary));
        summary
    }

    /// Selection, evaluation, and sync for one catalog.
    fn process_catalog(
        &self,
        target: &CatalogTarget,
        summary: &mut CatalogRunSummary,
    ) -> Result<(), PublisherError> {
        let catalog = load_catalog(&self.store, &target.definition.id)?;
        let stale = select_stale(&self.store, &catalog)?;
        summary.selected = u64::try_from(stale.len()).unwrap_or(u64::MAX);
        let schema_uri = catalog
            .schema_uri
            .as_ref()
            .ok_or_else(|| SelectionError::MissingSchema(catalog.id.clone()))?;
        let schema = self.schemas.get_schema(schema_uri)?;
        let evaluator = Evaluator::new(target.definition.clone(), schema);

        for record in &stale {
            match self.evaluate_record(&evaluator, record) {
                Ok(update) => {
                    if update.decision.is_published() {
                        summary.published += 1;
                    } else {
                        summary.hidden += 1;
                    }
                    self.audit.record(&PublishAuditEvent::record_evaluated(&update));
                }
                Err(err) => {
                    summary.failed += 1;
                    self.audit.record(&PublishAuditEvent::record_failed(
                        &catalog.id,
                        &record.record_id,
                        err.to_string(),
                    ));
                }
            }
        }

        if let Some(registry) = &target.registry {
            self.sync_catalog(&catalog.id, registry.as_ref(), summary)?;
        }
        Ok(())
    }

    /// Evaluates one stale record and persists the decision.
    fn evaluate_record(
        &self,
        evaluator: &Evaluator,
        stale: &StaleRecord,
    ) -> Result<CatalogRecordUpdate, EvaluationError> {
        let snapshot = self
            .store
            .record_snapshot(&stale.record_id)?
            .ok_or_else(|| EvaluationError::RecordNotFound(stale.record_id.clone()))?;
        let update = evaluator.evaluate(&snapshot, stale)?;
        self.store.upsert_catalog_record(&update)?;
        Ok(update)
    }

    /// Registry sync pass over eligible catalog records.
    fn sync_catalog(
        &self,
        catalog_id: &CatalogId,
        registry: &(dyn RegistryClient + Send + Sync),
        summary: &mut CatalogRunSummary,
    ) -> Result<(), PublisherError> {
        let candidates = self.store.sync_candidates(
            catalog_id,
            self.config.max_retries,
            self.config.batch_size,
        )?;
        let synchronizer =
            Synchronizer::new(&self.store, registry, self.clock.as_ref(), self.config.max_retries);
        for candidate in &candidates {
            match synchronizer.sync(candidate) {
                Ok(SyncOutcome::Synced {
                    action,
                    record,
                }) => {
                    if action == SyncAction::Unchanged {
                        summary.unchanged += 1;
                    } else {
                        summary.synced += 1;
                    }
                    self.audit.record(&PublishAuditEvent::record_synced(&record, action));
                }
                Ok(SyncOutcome::Failed {
                    error,
                    record,
                }) => {
                    summary.sync_errors += 1;
                    self.audit.record(&PublishAuditEvent::record_sync_failed(&record, &error));
                }
                Err(err) => {
                    summary.sync_errors += 1;
                    self.audit.record(&PublishAuditEvent::record_sync_store_failed(
                        catalog_id,
                        &candidate.catalog_record.record_id,
                        err.to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}
