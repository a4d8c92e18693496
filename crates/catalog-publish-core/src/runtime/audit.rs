// crates/catalog-publish-core/src/runtime/audit.rs
// ============================================================================
// Module: Publish Audit Logging
// Description: Structured JSON-line events for publish runs.
// Purpose: Surface per-record outcomes and run summaries to operators.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every per-record decision, sync attempt, and per-catalog summary is emitted
//! as one [`PublishAuditEvent`] through a [`PublishAuditSink`]. Sinks are
//! injected so hosts can route events to stderr, a file, or nowhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::CatalogId;
use crate::core::CatalogRecordUpdate;
use crate::core::CatalogRunSummary;
use crate::core::RecordId;
use crate::core::SyncRecord;
use crate::interfaces::RegistryError;
use crate::runtime::synchronizer::SyncAction;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Publish audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct PublishAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Catalog identifier.
    pub catalog_id: CatalogId,
    /// Record identifier for per-record events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    /// Decision watermark (unix millis) for evaluation events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<i64>,
    /// Publish decision or registry state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    /// Registry action label for sync events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    /// Registry status code for sync failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Consecutive sync failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Catalog summary for summary events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CatalogRunSummary>,
}

impl PublishAuditEvent {
    /// Creates an event with only the common fields populated.
    fn base(event: &'static str, catalog_id: &CatalogId, record_id: Option<&RecordId>) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            catalog_id: catalog_id.clone(),
            record_id: record_id.cloned(),
            watermark: None,
            published: None,
            action: None,
            status: None,
            retries: None,
            error: None,
            summary: None,
        }
    }

    /// A record was evaluated and its decision persisted.
    #[must_use]
    pub fn record_evaluated(update: &CatalogRecordUpdate) -> Self {
        let mut event = Self::base("record_evaluated", &update.catalog_id, Some(&update.record_id));
        event.watermark = Some(update.timestamp.as_unix_millis());
        event.published = Some(update.decision.is_published());
        event
    }

    /// A record could not be evaluated or persisted.
    #[must_use]
    pub fn record_failed(catalog_id: &CatalogId, record_id: &RecordId, error: String) -> Self {
        let mut event = Self::base("record_failed", catalog_id, Some(record_id));
        event.error = Some(error);
        event
    }

    /// A record's registry state was reconciled.
    #[must_use]
    pub fn record_synced(record: &SyncRecord, action: SyncAction) -> Self {
        let mut event = Self::base("record_synced", &record.catalog_id, Some(&record.record_id));
        event.published = Some(record.published);
        event.action = Some(action.as_str());
        event
    }

    /// A registry call failed and the failure was recorded.
    #[must_use]
    pub fn record_sync_failed(record: &SyncRecord, error: &RegistryError) -> Self {
        let mut event =
            Self::base("record_sync_failed", &record.catalog_id, Some(&record.record_id));
        event.status = error.status;
        event.retries = record.retries;
        event.error = Some(error.to_string());
        event
    }

    /// A record's sync row could not be saved.
    #[must_use]
    pub fn record_sync_store_failed(
        catalog_id: &CatalogId,
        record_id: &RecordId,
        error: String,
    ) -> Self {
        let mut event = Self::base("record_sync_failed", catalog_id, Some(record_id));
        event.error = Some(error);
        event
    }

    /// A catalog pass was aborted.
    #[must_use]
    pub fn catalog_failed(catalog_id: &CatalogId, error: String) -> Self {
        let mut event = Self::base("catalog_failed", catalog_id, None);
        event.error = Some(error);
        event
    }

    /// A catalog pass finished.
    #[must_use]
    pub fn catalog_summary(summary: &CatalogRunSummary) -> Self {
        let mut event = Self::base("catalog_summary", &summary.catalog_id, None);
        event.summary = Some(summary.clone());
        event
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for publish events.
pub trait PublishAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &PublishAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl PublishAuditSink for StderrAuditSink {
    fn record(&self, event: &PublishAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl PublishAuditSink for FileAuditSink {
    fn record(&self, event: &PublishAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl PublishAuditSink for NoopAuditSink {
    fn record(&self, _event: &PublishAuditEvent) {}
}
