// crates/catalog-publish-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Publication Store
// Description: Durable record source and catalog record store backed by SQLite.
// Purpose: Persist publish decisions and sync rows with per-record transactions.
// Dependencies: catalog-publish-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Records, tags, and catalogs are owned by the registry's CRUD layer; this
//! store reads them and owns the `catalog_record` and `sync_record` tables.
//! The four staleness inputs of every record are produced by one aggregate
//! query. Row invariants (`published` iff a published document exists,
//! `retries` only alongside `error`) are enforced by table constraints and
//! re-checked on load, failing closed on corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use catalog_publish_core::Catalog;
use catalog_publish_core::CatalogId;
use catalog_publish_core::CatalogRecord;
use catalog_publish_core::CatalogRecordStore;
use catalog_publish_core::CatalogRecordUpdate;
use catalog_publish_core::CollectionId;
use catalog_publish_core::Decision;
use catalog_publish_core::Doi;
use catalog_publish_core::HashAlgorithm;
use catalog_publish_core::Record;
use catalog_publish_core::RecordId;
use catalog_publish_core::RecordSnapshot;
use catalog_publish_core::RecordSource;
use catalog_publish_core::RecordWatermark;
use catalog_publish_core::RecordWatermarkRow;
use catalog_publish_core::SchemaId;
use catalog_publish_core::SchemaUri;
use catalog_publish_core::SnapshotDigest;
use catalog_publish_core::StoreError;
use catalog_publish_core::SyncCandidate;
use catalog_publish_core::SyncRecord;
use catalog_publish_core::TagCardinality;
use catalog_publish_core::TagId;
use catalog_publish_core::TagInstance;
use catalog_publish_core::Timestamp;
use catalog_publish_core::UserId;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Table definitions for schema version 1.
const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS collection (
        id TEXT PRIMARY KEY
    );
    CREATE TABLE IF NOT EXISTS user_account (
        id TEXT PRIMARY KEY,
        name TEXT
    );
    CREATE TABLE IF NOT EXISTS tag (
        id TEXT PRIMARY KEY,
        cardinality TEXT NOT NULL,
        public INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS record (
        id TEXT PRIMARY KEY,
        doi TEXT UNIQUE,
        sid TEXT UNIQUE,
        collection_id TEXT NOT NULL REFERENCES collection(id) ON DELETE CASCADE,
        schema_id TEXT NOT NULL,
        metadata TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        CHECK (doi IS NOT NULL OR sid IS NOT NULL)
    );
    CREATE TABLE IF NOT EXISTS record_tag (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        record_id TEXT NOT NULL REFERENCES record(id) ON DELETE CASCADE,
        tag_id TEXT NOT NULL REFERENCES tag(id) ON DELETE CASCADE,
        user_id TEXT REFERENCES user_account(id) ON DELETE SET NULL,
        data TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_record_tag_record ON record_tag (record_id);
    CREATE TABLE IF NOT EXISTS collection_tag (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        collection_id TEXT NOT NULL REFERENCES collection(id) ON DELETE CASCADE,
        tag_id TEXT NOT NULL REFERENCES tag(id) ON DELETE CASCADE,
        user_id TEXT REFERENCES user_account(id) ON DELETE SET NULL,
        data TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_collection_tag_collection ON collection_tag (collection_id);
    CREATE TABLE IF NOT EXISTS catalog (
        id TEXT PRIMARY KEY,
        schema_uri TEXT,
        schema_timestamp INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS catalog_record (
        catalog_id TEXT NOT NULL REFERENCES catalog(id) ON DELETE CASCADE,
        record_id TEXT NOT NULL REFERENCES record(id) ON DELETE CASCADE,
        validity TEXT NOT NULL,
        published INTEGER NOT NULL,
        published_record TEXT,
        timestamp INTEGER NOT NULL,
        PRIMARY KEY (catalog_id, record_id),
        CHECK ((published = 1) = (published_record IS NOT NULL))
    );
    CREATE TABLE IF NOT EXISTS sync_record (
        catalog_id TEXT NOT NULL,
        record_id TEXT NOT NULL,
        doi TEXT,
        url TEXT,
        metadata TEXT,
        digest TEXT,
        digest_algorithm TEXT,
        published INTEGER NOT NULL,
        updated INTEGER,
        checked INTEGER NOT NULL,
        error TEXT,
        retries INTEGER,
        PRIMARY KEY (catalog_id, record_id),
        FOREIGN KEY (catalog_id, record_id)
            REFERENCES catalog_record(catalog_id, record_id) ON DELETE CASCADE,
        CHECK (retries IS NULL OR error IS NOT NULL)
    );";

/// Aggregates the four staleness inputs of every record for one catalog.
const WATERMARK_SQL: &str = "
    SELECT r.id,
           r.timestamp,
           (SELECT MAX(rt.timestamp) FROM record_tag rt WHERE rt.record_id = r.id),
           (SELECT MAX(ct.timestamp) FROM collection_tag ct
             WHERE ct.collection_id = r.collection_id),
           cr.timestamp
      FROM record r
      LEFT JOIN catalog_record cr ON cr.record_id = r.id AND cr.catalog_id = ?1
     ORDER BY r.id";

/// Catalog record columns, in [`CatalogRecordRow::from_row`] order.
const CATALOG_RECORD_COLUMNS: &str =
    "cr.catalog_id, cr.record_id, cr.validity, cr.published, cr.published_record, cr.timestamp";

/// Sync record columns, in [`SyncRow::from_row`] order.
const SYNC_COLUMNS: &str = "s.catalog_id, s.record_id, s.doi, s.url, s.metadata, s.digest, \
                            s.digest_algorithm, s.published, s.updated, s.checked, s.error, \
                            s.retries";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` publication store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row violates an invariant.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Maps an engine error.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err function pointer.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed publication store.
#[derive(Clone)]
pub struct SqlitePublicationStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqlitePublicationStore {
    /// Opens an `SQLite`-backed publication store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Runs `work` inside one transaction, committing on success.
    fn with_transaction<T>(
        &self,
        work: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let value = work(&tx)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(value)
    }
}

// ============================================================================
// SECTION: Seeding
// ============================================================================

impl SqlitePublicationStore {
    /// Inserts or replaces a catalog row.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn upsert_catalog(&self, catalog: &Catalog) -> Result<(), SqliteStoreError> {
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO catalog (id, schema_uri, schema_timestamp) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(id) DO UPDATE SET schema_uri = excluded.schema_uri, \
                 schema_timestamp = excluded.schema_timestamp",
                params![
                    catalog.id.as_str(),
                    catalog.schema_uri.as_ref().map(SchemaUri::as_str),
                    catalog.schema_timestamp.as_unix_millis()
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Inserts or replaces a record row, creating its collection if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when the record has neither a DOI
    /// nor a secondary id, or [`SqliteStoreError::Db`] when the write fails.
    pub fn upsert_record(&self, record: &Record) -> Result<(), SqliteStoreError> {
        if record.doi.is_none() && record.sid.is_none() {
            return Err(SqliteStoreError::Invalid(format!(
                "record {} requires a doi or a sid",
                record.id
            )));
        }
        let metadata = serde_json::to_string(&record.metadata)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        self.with_transaction(|tx| {
            ensure_collection(tx, &record.collection_id)?;
            tx.execute(
                "INSERT INTO record (id, doi, sid, collection_id, schema_id, metadata, timestamp) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) ON CONFLICT(id) DO UPDATE SET \
                 doi = excluded.doi, sid = excluded.sid, collection_id = excluded.collection_id, \
                 schema_id = excluded.schema_id, metadata = excluded.metadata, \
                 timestamp = excluded.timestamp",
                params![
                    record.id.as_str(),
                    record.doi.as_ref().map(Doi::as_str),
                    record.sid.as_deref(),
                    record.collection_id.as_str(),
                    record.schema_id.as_str(),
                    metadata,
                    record.timestamp.as_unix_millis()
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Attaches a tag instance to a record, registering its tag type and user.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the record is unknown or the write
    /// fails.
    pub fn add_record_tag(
        &self,
        record_id: &RecordId,
        tag: &TagInstance,
    ) -> Result<(), SqliteStoreError> {
        self.insert_tag("record_tag", "record_id", record_id.as_str(), tag)
    }

    /// Attaches a tag instance to a collection, registering its tag type and user.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn add_collection_tag(
        &self,
        collection_id: &CollectionId,
        tag: &TagInstance,
    ) -> Result<(), SqliteStoreError> {
        self.with_transaction(|tx| ensure_collection(tx, collection_id))?;
        self.insert_tag("collection_tag", "collection_id", collection_id.as_str(), tag)
    }

    /// Deletes a record; tags, decisions, and sync rows cascade.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the delete fails.
    pub fn delete_record(&self, record_id: &RecordId) -> Result<(), SqliteStoreError> {
        self.with_transaction(|tx| {
            tx.execute("DELETE FROM record WHERE id = ?1", params![record_id.as_str()])
                .map_err(db_error)?;
            Ok(())
        })
    }

    /// Inserts a tag instance into `table`, keyed by `owner_column`.
    fn insert_tag(
        &self,
        table: &str,
        owner_column: &str,
        owner_id: &str,
        tag: &TagInstance,
    ) -> Result<(), SqliteStoreError> {
        let data = serde_json::to_string(&tag.data)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO tag (id, cardinality, public) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(id) DO UPDATE SET cardinality = excluded.cardinality, \
                 public = excluded.public",
                params![tag.tag_id.as_str(), tag.cardinality.as_str(), tag.public],
            )
            .map_err(db_error)?;
            if let Some(user_id) = &tag.user_id {
                tx.execute(
                    "INSERT INTO user_account (id, name) VALUES (?1, ?2) \
                     ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                    params![user_id.as_str(), tag.user_name.as_deref()],
                )
                .map_err(db_error)?;
            }
            tx.execute(
                &format!(
                    "INSERT INTO {table} ({owner_column}, tag_id, user_id, data, timestamp) \
                     VALUES (?1, ?2, ?3, ?4, ?5)"
                ),
                params![
                    owner_id,
                    tag.tag_id.as_str(),
                    tag.user_id.as_ref().map(UserId::as_str),
                    data,
                    tag.timestamp.as_unix_millis()
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }
}

// ============================================================================
// SECTION: Record Source
// ============================================================================

impl RecordSource for SqlitePublicationStore {
    fn catalog(&self, catalog_id: &CatalogId) -> Result<Option<Catalog>, StoreError> {
        let row = self.with_transaction(|tx| {
            tx.query_row(
                "SELECT schema_uri, schema_timestamp FROM catalog WHERE id = ?1",
                params![catalog_id.as_str()],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()
            .map_err(db_error)
        })?;
        Ok(row.map(|(schema_uri, schema_timestamp)| Catalog {
            id: catalog_id.clone(),
            schema_uri: schema_uri.map(SchemaUri::new),
            schema_timestamp: Timestamp::from_unix_millis(schema_timestamp),
        }))
    }

    fn record_watermarks(
        &self,
        catalog_id: &CatalogId,
    ) -> Result<Vec<RecordWatermarkRow>, StoreError> {
        let rows = self.with_transaction(|tx| {
            let mut statement = tx.prepare(WATERMARK_SQL).map_err(db_error)?;
            let rows = statement
                .query_map(params![catalog_id.as_str()], |row| {
                    Ok(RecordWatermarkRow {
                        record_id: RecordId::new(row.get::<_, String>(0)?),
                        watermark: RecordWatermark {
                            record_timestamp: Timestamp::from_unix_millis(row.get(1)?),
                            latest_record_tag: row
                                .get::<_, Option<i64>>(2)?
                                .map(Timestamp::from_unix_millis),
                            latest_collection_tag: row
                                .get::<_, Option<i64>>(3)?
                                .map(Timestamp::from_unix_millis),
                            evaluated_at: row
                                .get::<_, Option<i64>>(4)?
                                .map(Timestamp::from_unix_millis),
                        },
                    })
                })
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            Ok(rows)
        })?;
        Ok(rows)
    }

    fn record_snapshot(&self, record_id: &RecordId) -> Result<Option<RecordSnapshot>, StoreError> {
        let snapshot = self.with_transaction(|tx| {
            let row = tx
                .query_row(
                    "SELECT doi, sid, collection_id, schema_id, metadata, timestamp \
                     FROM record WHERE id = ?1",
                    params![record_id.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, i64>(5)?,
                        ))
                    },
                )
                .optional()
                .map_err(db_error)?;
            let Some((doi, sid, collection_id, schema_id, metadata, timestamp)) = row else {
                return Ok(None);
            };
            let record = Record {
                id: record_id.clone(),
                doi: doi.map(Doi::new),
                sid,
                collection_id: CollectionId::new(collection_id),
                schema_id: SchemaId::new(schema_id),
                metadata: parse_json(&metadata, "record metadata")?,
                timestamp: Timestamp::from_unix_millis(timestamp),
            };
            let record_tags = load_tags(tx, "record_tag", "record_id", record_id.as_str())?;
            let collection_tags = load_tags(
                tx,
                "collection_tag",
                "collection_id",
                record.collection_id.as_str(),
            )?;
            Ok(Some(RecordSnapshot {
                record,
                record_tags,
                collection_tags,
            }))
        })?;
        Ok(snapshot)
    }
}

// ============================================================================
// SECTION: Catalog Record Store
// ============================================================================

impl CatalogRecordStore for SqlitePublicationStore {
    fn upsert_catalog_record(&self, update: &CatalogRecordUpdate) -> Result<(), StoreError> {
        let validity = serde_json::to_string(&update.validity)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let published_record = update
            .decision
            .published_record()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO catalog_record (catalog_id, record_id, validity, published, \
                 published_record, timestamp) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(catalog_id, record_id) DO UPDATE SET validity = excluded.validity, \
                 published = excluded.published, published_record = excluded.published_record, \
                 timestamp = excluded.timestamp",
                params![
                    update.catalog_id.as_str(),
                    update.record_id.as_str(),
                    validity,
                    update.decision.is_published(),
                    published_record,
                    update.timestamp.as_unix_millis()
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        Ok(())
    }

    fn catalog_record(
        &self,
        catalog_id: &CatalogId,
        record_id: &RecordId,
    ) -> Result<Option<CatalogRecord>, StoreError> {
        let row = self.with_transaction(|tx| {
            tx.query_row(
                &format!(
                    "SELECT {CATALOG_RECORD_COLUMNS} FROM catalog_record cr \
                     WHERE cr.catalog_id = ?1 AND cr.record_id = ?2"
                ),
                params![catalog_id.as_str(), record_id.as_str()],
                |row| CatalogRecordRow::from_row(row, 0),
            )
            .optional()
            .map_err(db_error)
        })?;
        Ok(row.map(CatalogRecordRow::into_record).transpose()?)
    }

    fn catalog_records_changed_since(
        &self,
        catalog_id: &CatalogId,
        since: Option<Timestamp>,
    ) -> Result<Vec<CatalogRecord>, StoreError> {
        let rows = self.with_transaction(|tx| {
            let mut statement = tx
                .prepare(&format!(
                    "SELECT {CATALOG_RECORD_COLUMNS} FROM catalog_record cr \
                     WHERE cr.catalog_id = ?1 AND (?2 IS NULL OR cr.timestamp > ?2) \
                     ORDER BY cr.record_id"
                ))
                .map_err(db_error)?;
            let rows = statement
                .query_map(
                    params![catalog_id.as_str(), since.map(Timestamp::as_unix_millis)],
                    |row| CatalogRecordRow::from_row(row, 0),
                )
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            Ok(rows)
        })?;
        let records = rows
            .into_iter()
            .map(CatalogRecordRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn sync_candidates(
        &self,
        catalog_id: &CatalogId,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<SyncCandidate>, StoreError> {
        let limit = i64::try_from(limit)
            .map_err(|_| SqliteStoreError::Invalid("sync candidate limit too large".to_string()))?;
        let rows = self.with_transaction(|tx| {
            let mut statement = tx
                .prepare(&format!(
                    "SELECT {CATALOG_RECORD_COLUMNS}, {SYNC_COLUMNS} \
                       FROM catalog_record cr \
                       LEFT JOIN sync_record s \
                         ON s.catalog_id = cr.catalog_id AND s.record_id = cr.record_id \
                      WHERE cr.catalog_id = ?1 \
                        AND (s.record_id IS NULL \
                             OR s.checked < cr.timestamp \
                             OR (s.error IS NOT NULL AND COALESCE(s.retries, 0) < ?2)) \
                      ORDER BY cr.record_id \
                      LIMIT ?3"
                ))
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![catalog_id.as_str(), max_retries, limit], |row| {
                    Ok((CatalogRecordRow::from_row(row, 0)?, SyncRow::from_optional_row(row, 6)?))
                })
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            Ok(rows)
        })?;
        let candidates = rows
            .into_iter()
            .map(|(catalog_record, sync)| {
                Ok(SyncCandidate {
                    catalog_record: catalog_record.into_record()?,
                    sync: sync.map(SyncRow::into_record).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, SqliteStoreError>>()?;
        Ok(candidates)
    }

    fn save_sync_record(&self, record: &SyncRecord) -> Result<(), StoreError> {
        let metadata = record
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO sync_record (catalog_id, record_id, doi, url, metadata, digest, \
                 digest_algorithm, published, updated, checked, error, retries) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
                 ON CONFLICT(catalog_id, record_id) DO UPDATE SET doi = excluded.doi, \
                 url = excluded.url, metadata = excluded.metadata, digest = excluded.digest, \
                 digest_algorithm = excluded.digest_algorithm, published = excluded.published, \
                 updated = excluded.updated, checked = excluded.checked, error = excluded.error, \
                 retries = excluded.retries",
                params![
                    record.catalog_id.as_str(),
                    record.record_id.as_str(),
                    record.doi.as_ref().map(Doi::as_str),
                    record.url.as_deref(),
                    metadata,
                    record.digest.as_ref().map(|digest| digest.value.as_str()),
                    record.digest.as_ref().map(|digest| digest.algorithm.label()),
                    record.published,
                    record.updated.map(Timestamp::as_unix_millis),
                    record.checked.as_unix_millis(),
                    record.error.as_deref(),
                    record.retries
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })?;
        Ok(())
    }

    fn sync_record(
        &self,
        catalog_id: &CatalogId,
        record_id: &RecordId,
    ) -> Result<Option<SyncRecord>, StoreError> {
        let row = self.with_transaction(|tx| {
            tx.query_row(
                &format!(
                    "SELECT {SYNC_COLUMNS} FROM sync_record s \
                     WHERE s.catalog_id = ?1 AND s.record_id = ?2"
                ),
                params![catalog_id.as_str(), record_id.as_str()],
                |row| SyncRow::from_optional_row(row, 0),
            )
            .optional()
            .map_err(db_error)
        })?;
        Ok(row.flatten().map(SyncRow::into_record).transpose()?)
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw `catalog_record` columns.
struct CatalogRecordRow {
    /// Catalog identifier.
    catalog_id: String,
    /// Record identifier.
    record_id: String,
    /// Serialized validity report.
    validity: String,
    /// Published flag.
    published: bool,
    /// Serialized published document.
    published_record: Option<String>,
    /// Watermark.
    timestamp: i64,
}

impl CatalogRecordRow {
    /// Reads catalog record columns starting at `offset`.
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            catalog_id: row.get(offset)?,
            record_id: row.get(offset + 1)?,
            validity: row.get(offset + 2)?,
            published: row.get(offset + 3)?,
            published_record: row.get(offset + 4)?,
            timestamp: row.get(offset + 5)?,
        })
    }

    /// Converts the row, rejecting a mismatched publish flag.
    fn into_record(self) -> Result<CatalogRecord, SqliteStoreError> {
        let published_record = self
            .published_record
            .as_deref()
            .map(|raw| parse_json(raw, "published record"))
            .transpose()?;
        let decision = Decision::from_columns(self.published, published_record).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!(
                "published flag disagrees with published record for {}/{}",
                self.catalog_id, self.record_id
            ))
        })?;
        Ok(CatalogRecord {
            validity: parse_json(&self.validity, "validity report")?,
            catalog_id: CatalogId::new(self.catalog_id),
            record_id: RecordId::new(self.record_id),
            decision,
            timestamp: Timestamp::from_unix_millis(self.timestamp),
        })
    }
}

/// Raw `sync_record` columns.
struct SyncRow {
    /// Catalog identifier.
    catalog_id: String,
    /// Record identifier.
    record_id: String,
    /// Last-synced DOI.
    doi: Option<String>,
    /// Last-synced landing URL.
    url: Option<String>,
    /// Serialized last-synced metadata.
    metadata: Option<String>,
    /// Digest value.
    digest: Option<String>,
    /// Digest algorithm label.
    digest_algorithm: Option<String>,
    /// Registry publication state.
    published: bool,
    /// Last successful change.
    updated: Option<i64>,
    /// Last attempt.
    checked: i64,
    /// Last failure.
    error: Option<String>,
    /// Consecutive failures.
    retries: Option<i64>,
}

impl SyncRow {
    /// Reads sync columns starting at `offset`; `None` when the join missed.
    fn from_optional_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<Self>> {
        let Some(catalog_id) = row.get::<_, Option<String>>(offset)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            catalog_id,
            record_id: row.get(offset + 1)?,
            doi: row.get(offset + 2)?,
            url: row.get(offset + 3)?,
            metadata: row.get(offset + 4)?,
            digest: row.get(offset + 5)?,
            digest_algorithm: row.get(offset + 6)?,
            published: row.get(offset + 7)?,
            updated: row.get(offset + 8)?,
            checked: row.get(offset + 9)?,
            error: row.get(offset + 10)?,
            retries: row.get(offset + 11)?,
        }))
    }

    /// Converts the row, rejecting invalid retry bookkeeping.
    fn into_record(self) -> Result<SyncRecord, SqliteStoreError> {
        let retries = self
            .retries
            .map(|value| {
                u32::try_from(value).map_err(|_| {
                    SqliteStoreError::Corrupt(format!(
                        "invalid retries for {}/{}",
                        self.catalog_id, self.record_id
                    ))
                })
            })
            .transpose()?;
        if retries.is_some() && self.error.is_none() {
            return Err(SqliteStoreError::Corrupt(format!(
                "retries without error for {}/{}",
                self.catalog_id, self.record_id
            )));
        }
        let digest = match (self.digest, self.digest_algorithm) {
            (Some(value), Some(label)) => {
                let algorithm = HashAlgorithm::from_label(&label).ok_or_else(|| {
                    SqliteStoreError::Invalid(format!("unsupported digest algorithm: {label}"))
                })?;
                Some(SnapshotDigest {
                    algorithm,
                    value,
                })
            }
            (None, None) => None,
            _ => {
                return Err(SqliteStoreError::Corrupt(format!(
                    "incomplete digest for {}/{}",
                    self.catalog_id, self.record_id
                )));
            }
        };
        let metadata =
            self.metadata.as_deref().map(|raw| parse_json(raw, "sync metadata")).transpose()?;
        Ok(SyncRecord {
            catalog_id: CatalogId::new(self.catalog_id),
            record_id: RecordId::new(self.record_id),
            doi: self.doi.map(Doi::new),
            url: self.url,
            metadata,
            digest,
            published: self.published,
            updated: self.updated.map(Timestamp::from_unix_millis),
            checked: Timestamp::from_unix_millis(self.checked),
            error: self.error,
            retries,
        })
    }
}

/// Loads tag instances for one owner, joined with tag types and users.
fn load_tags(
    tx: &Transaction<'_>,
    table: &str,
    owner_column: &str,
    owner_id: &str,
) -> Result<Vec<TagInstance>, SqliteStoreError> {
    let mut statement = tx
        .prepare(&format!(
            "SELECT x.tag_id, x.user_id, u.name, x.data, x.timestamp, t.cardinality, t.public \
               FROM {table} x \
               JOIN tag t ON t.id = x.tag_id \
               LEFT JOIN user_account u ON u.id = x.user_id \
              WHERE x.{owner_column} = ?1 \
              ORDER BY x.id"
        ))
        .map_err(db_error)?;
    let rows = statement
        .query_map(params![owner_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, bool>(6)?,
            ))
        })
        .map_err(db_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error)?;
    rows.into_iter()
        .map(|(tag_id, user_id, user_name, data, timestamp, cardinality, public)| {
            let cardinality = TagCardinality::from_label(&cardinality).ok_or_else(|| {
                SqliteStoreError::Invalid(format!("unknown tag cardinality: {cardinality}"))
            })?;
            Ok(TagInstance {
                tag_id: TagId::new(tag_id),
                user_id: user_id.map(UserId::new),
                user_name,
                data: parse_json(&data, "tag data")?,
                timestamp: Timestamp::from_unix_millis(timestamp),
                cardinality,
                public,
            })
        })
        .collect()
}

/// Inserts a collection row if absent.
fn ensure_collection(
    tx: &Transaction<'_>,
    collection_id: &CollectionId,
) -> Result<(), SqliteStoreError> {
    tx.execute(
        "INSERT INTO collection (id) VALUES (?1) ON CONFLICT(id) DO NOTHING",
        params![collection_id.as_str()],
    )
    .map_err(db_error)?;
    Ok(())
}

/// Parses a stored JSON column.
fn parse_json(raw: &str, what: &str) -> Result<Value, SqliteStoreError> {
    serde_json::from_str(raw)
        .map_err(|err| SqliteStoreError::Corrupt(format!("invalid {what} json: {err}")))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    if path
        .components()
        .any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(SqliteStoreError::Invalid(
            "store path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(connection)
}

/// Initializes the schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(SCHEMA_SQL).map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}
