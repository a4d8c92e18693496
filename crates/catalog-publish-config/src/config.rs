// crates/catalog-publish-config/src/config.rs
// ============================================================================
// Module: Catalog Publish Configuration
// Description: Configuration loading and validation for the publish job.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: catalog-publish-core, catalog-publish-registry, catalog-publish-store-sqlite, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file names the store, the audit sink, the schema files, and the
//! catalogs to publish, each optionally mirrored to a `DataCite` account.
//! Registry passwords are read from the environment when `password_env` is
//! used so they need not live in the file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use catalog_publish_core::CatalogDefinition;
use catalog_publish_core::CatalogId;
use catalog_publish_core::DEFAULT_BATCH_SIZE;
use catalog_publish_core::DEFAULT_MAX_RETRIES;
use catalog_publish_core::Projection;
use catalog_publish_core::PublisherConfig;
use catalog_publish_core::SchemaUri;
use catalog_publish_registry::DataCiteConfig;
use catalog_publish_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "catalog-publish.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CATALOG_PUBLISH_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of configured catalogs.
const MAX_CATALOGS: usize = 64;
/// Maximum number of configured schemas.
const MAX_SCHEMAS: usize = 256;
/// Maximum catalog id length.
const MAX_CATALOG_ID_LENGTH: usize = 64;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Root configuration for the publish job.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPublishConfig {
    /// Run-wide limits.
    #[serde(default)]
    pub publisher: PublisherSection,
    /// Relational store settings.
    pub store: SqliteStoreConfig,
    /// Audit sink settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Publication schema files.
    #[serde(default)]
    pub schemas: Vec<SchemaSourceConfig>,
    /// Catalogs processed on each run, in order.
    #[serde(default)]
    pub catalogs: Vec<CatalogConfig>,
}

impl CatalogPublishConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.publisher.validate()?;
        validate_path_string("store.path", &self.store.path.to_string_lossy())?;
        self.audit.validate()?;
        if self.schemas.len() > MAX_SCHEMAS {
            return Err(ConfigError::Invalid("too many schemas".to_string()));
        }
        let mut uris = BTreeSet::new();
        for schema in &self.schemas {
            schema.validate()?;
            if !uris.insert(schema.uri.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate schema uri: {}", schema.uri)));
            }
        }
        if self.catalogs.is_empty() {
            return Err(ConfigError::Invalid("at least one catalog is required".to_string()));
        }
        if self.catalogs.len() > MAX_CATALOGS {
            return Err(ConfigError::Invalid("too many catalogs".to_string()));
        }
        let mut ids = BTreeSet::new();
        for catalog in &self.catalogs {
            catalog.validate()?;
            if !ids.insert(catalog.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate catalog id: {}", catalog.id)));
            }
        }
        Ok(())
    }

    /// Returns the run-wide publisher limits.
    #[must_use]
    pub const fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            batch_size: self.publisher.batch_size,
            max_retries: self.publisher.max_retries,
        }
    }
}

/// Run-wide publisher limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PublisherSection {
    /// Maximum registry sync candidates per catalog per run.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Consecutive sync failures tolerated before a record is excluded.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for PublisherSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
        }
    }
}

impl PublisherSection {
    /// Validates publisher limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("publisher.batch_size must be positive".to_string()));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "publisher.max_retries must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audit sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }
}

/// Publication schema registered from a file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchemaSourceConfig {
    /// URI catalogs use to refer to the schema.
    pub uri: SchemaUri,
    /// Path to the JSON schema document.
    pub path: String,
}

impl SchemaSourceConfig {
    /// Validates one schema entry.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.uri.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid("schemas.uri must be non-empty".to_string()));
        }
        validate_path_string("schemas.path", &self.path)
    }

    /// Returns the schema path.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.path.trim())
    }
}

/// Published-record shape selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    /// Native registry shape.
    Native,
    /// `DataCite` registry shape.
    Datacite,
}

/// One configured catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    /// Catalog identifier, matching the catalog row in the store.
    pub id: CatalogId,
    /// Published-record shape.
    pub projection: ProjectionKind,
    /// Landing page base URL, required for `datacite`.
    #[serde(default)]
    pub landing_base_url: Option<String>,
    /// External registry account.
    #[serde(default)]
    pub registry: Option<RegistryConfig>,
}

impl CatalogConfig {
    /// Validates one catalog entry.
    fn validate(&self) -> Result<(), ConfigError> {
        let id = self.id.as_str();
        if id.trim().is_empty() || id.len() > MAX_CATALOG_ID_LENGTH {
            return Err(ConfigError::Invalid(format!("catalogs.id is invalid: {id}")));
        }
        match (self.projection, &self.landing_base_url) {
            (ProjectionKind::Native, Some(_)) => {
                return Err(ConfigError::Invalid(format!(
                    "catalog {id}: landing_base_url is only valid for datacite"
                )));
            }
            (ProjectionKind::Datacite, None) => {
                return Err(ConfigError::Invalid(format!(
                    "catalog {id}: datacite requires landing_base_url"
                )));
            }
            (ProjectionKind::Datacite, Some(url)) => {
                validate_http_url(&format!("catalog {id} landing_base_url"), url, false)?;
            }
            (ProjectionKind::Native, None) => {}
        }
        if let Some(registry) = &self.registry {
            if self.projection != ProjectionKind::Datacite {
                return Err(ConfigError::Invalid(format!(
                    "catalog {id}: registry requires the datacite projection"
                )));
            }
            registry.validate(id)?;
        }
        Ok(())
    }

    /// Returns the core catalog definition.
    #[must_use]
    pub fn definition(&self) -> CatalogDefinition {
        let projection = match (self.projection, &self.landing_base_url) {
            (ProjectionKind::Datacite, Some(url)) => Projection::DataCite {
                landing_base_url: url.clone(),
            },
            (ProjectionKind::Datacite, None) => Projection::DataCite {
                landing_base_url: String::new(),
            },
            (ProjectionKind::Native, _) => Projection::Native,
        };
        CatalogDefinition {
            id: self.id.clone(),
            projection,
        }
    }
}

/// `DataCite` account for a catalog.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryConfig {
    /// API base URL.
    pub api_url: String,
    /// Repository account id.
    pub username: String,
    /// Inline password.
    #[serde(default)]
    pub password: Option<String>,
    /// Environment variable holding the password.
    #[serde(default)]
    pub password_env: Option<String>,
    /// Request timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Allow cleartext HTTP (disabled by default).
    #[serde(default)]
    pub allow_http: bool,
}

impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_env", &self.password_env)
            .field("timeout_ms", &self.timeout_ms)
            .field("allow_http", &self.allow_http)
            .finish()
    }
}

impl RegistryConfig {
    /// Validates the registry entry for catalog `id`.
    fn validate(&self, id: &str) -> Result<(), ConfigError> {
        validate_http_url(&format!("catalog {id} registry.api_url"), &self.api_url, self.allow_http)?;
        if self.username.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "catalog {id}: registry.username must be non-empty"
            )));
        }
        match (&self.password, &self.password_env) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "catalog {id}: set exactly one of registry.password or registry.password_env"
                )));
            }
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(format!(
                "catalog {id}: registry.timeout_ms must be positive"
            )));
        }
        Ok(())
    }

    /// Builds the client configuration, reading the password from the process
    /// environment when `password_env` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the password cannot be resolved.
    pub fn to_datacite_config(&self) -> Result<DataCiteConfig, ConfigError> {
        self.to_datacite_config_with(|name| env::var(name).ok())
    }

    /// Builds the client configuration with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the password cannot be resolved.
    pub fn to_datacite_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<DataCiteConfig, ConfigError> {
        let password = match (&self.password, &self.password_env) {
            (Some(password), _) => password.clone(),
            (None, Some(name)) => lookup(name).ok_or_else(|| {
                ConfigError::Invalid(format!("registry password variable {name} is not set"))
            })?,
            (None, None) => {
                return Err(ConfigError::Invalid("registry password is not configured".to_string()));
            }
        };
        let mut config = DataCiteConfig::new(&self.api_url, &self.username, password);
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        config.allow_http = self.allow_http;
        Ok(config)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an absolute http(s) URL.
fn validate_http_url(field: &str, value: &str, allow_http: bool) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_http => Ok(()),
        other => Err(ConfigError::Invalid(format!("{field}: unsupported scheme {other}"))),
    }
}

/// Default sync batch size.
const fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Default retry budget.
const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// Default audit logging enabled.
const fn default_audit_enabled() -> bool {
    true
}
