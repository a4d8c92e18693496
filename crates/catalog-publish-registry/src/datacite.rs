// crates/catalog-publish-registry/src/datacite.rs
// ============================================================================
// Module: DataCite Client
// Description: Blocking DataCite REST client for DOI lifecycle calls.
// Purpose: Map publish, unpublish, and hide onto the DataCite DOIs endpoint.
// Dependencies: catalog-publish-core, reqwest, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The client speaks the `DataCite` JSON:API dialect:
//! - publish: `PUT /dois/{doi}` with `event = publish`, the landing URL, and
//!   the record metadata merged into the attributes.
//! - unpublish: `DELETE /dois/{doi}`; only draft DOIs can be deleted, so a
//!   findable DOI answers 405 and the caller falls back to hide.
//! - hide: `PUT /dois/{doi}` with `event = hide`.
//!
//! Any non-2xx status becomes a [`RegistryError`] carrying the status and the
//! parsed response body. Connection failures and timeouts carry no status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;
use std::time::Duration;

use catalog_publish_core::Doi;
use catalog_publish_core::RegistryClient;
use catalog_publish_core::RegistryError;
use catalog_publish_core::RegistryPayload;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON:API media type used by `DataCite`.
const JSON_API: &str = "application/vnd.api+json";
/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Default response size limit in bytes.
const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Connection settings for a `DataCite` repository account.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DataCiteConfig {
    /// API base URL, e.g. `https://api.datacite.org`.
    pub api_url: String,
    /// Repository account id.
    pub username: String,
    /// Repository account password.
    pub password: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Allow cleartext HTTP (disabled by default).
    #[serde(default)]
    pub allow_http: bool,
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl DataCiteConfig {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new(
        api_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            username: username.into(),
            password: password.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            allow_http: false,
            user_agent: default_user_agent(),
        }
    }
}

impl fmt::Debug for DataCiteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataCiteConfig")
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("allow_http", &self.allow_http)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Default request timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default response size limit.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Default user agent.
fn default_user_agent() -> String {
    concat!("catalog-publish/", env!("CARGO_PKG_VERSION")).to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while constructing a client.
#[derive(Debug, Error)]
pub enum DataCiteClientError {
    /// The configuration is unusable.
    #[error("invalid datacite config: {0}")]
    InvalidConfig(String),
    /// The HTTP client could not be built.
    #[error("datacite client build failed: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking `DataCite` REST client.
pub struct DataCiteClient {
    /// API base URL with any trailing slash removed.
    base_url: String,
    /// Account id.
    username: String,
    /// Account password.
    password: String,
    /// Response size limit.
    max_response_bytes: usize,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl DataCiteClient {
    /// Creates a client for one repository account.
    ///
    /// # Errors
    ///
    /// Returns [`DataCiteClientError`] when the base URL is invalid or the
    /// HTTP client cannot be created.
    pub fn new(config: &DataCiteConfig) -> Result<Self, DataCiteClientError> {
        let url = Url::parse(&config.api_url)
            .map_err(|err| DataCiteClientError::InvalidConfig(format!("api_url: {err}")))?;
        match url.scheme() {
            "https" => {}
            "http" if config.allow_http => {}
            other => {
                return Err(DataCiteClientError::InvalidConfig(format!(
                    "unsupported api_url scheme: {other}"
                )));
            }
        }
        if config.username.trim().is_empty() {
            return Err(DataCiteClientError::InvalidConfig("username must be non-empty".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| DataCiteClientError::Client(err.to_string()))?;
        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }

    /// Returns the endpoint URL for one DOI.
    fn doi_url(&self, doi: &Doi) -> Result<Url, RegistryError> {
        Url::parse(&format!("{}/dois/{}", self.base_url, doi.as_str()))
            .map_err(|err| RegistryError::transport(format!("invalid doi url: {err}")))
    }

    /// Sends a request with credentials and JSON:API headers.
    fn send(&self, request: RequestBuilder) -> Result<Value, RegistryError> {
        let mut response = request
            .basic_auth(&self.username, Some(&self.password))
            .header(ACCEPT, JSON_API)
            .send()
            .map_err(|err| RegistryError::transport(format!("request failed: {err}")))?;
        let status = response.status();
        let body = read_response_limited(&mut response, self.max_response_bytes)?;
        let detail = parse_body(&body);
        if status.is_success() {
            Ok(detail)
        } else {
            Err(RegistryError::status(status.as_u16(), detail))
        }
    }

    /// Sends a JSON:API document with `PUT`.
    fn put_document(&self, doi: &Doi, document: &Value) -> Result<Value, RegistryError> {
        let body = serde_json::to_vec(document)
            .map_err(|err| RegistryError::transport(format!("encode failed: {err}")))?;
        let request =
            self.client.put(self.doi_url(doi)?).header(CONTENT_TYPE, JSON_API).body(body);
        self.send(request)
    }
}

impl RegistryClient for DataCiteClient {
    fn publish(&self, payload: &RegistryPayload) -> Result<Value, RegistryError> {
        self.put_document(&payload.doi, &publish_document(payload))
    }

    fn unpublish(&self, doi: &Doi) -> Result<(), RegistryError> {
        self.send(self.client.delete(self.doi_url(doi)?))?;
        Ok(())
    }

    fn hide(&self, doi: &Doi) -> Result<(), RegistryError> {
        self.put_document(doi, &event_document(doi, "hide", Map::new()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Builds the `publish` request body.
///
/// Metadata keys become attributes; `doi`, `url`, and `event` always win.
#[must_use]
pub fn publish_document(payload: &RegistryPayload) -> Value {
    let mut attributes = match &payload.metadata {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    attributes.insert("url".to_string(), Value::String(payload.url.clone()));
    event_document(&payload.doi, "publish", attributes)
}

/// Wraps attributes in a JSON:API `dois` resource with an event.
fn event_document(doi: &Doi, event: &str, mut attributes: Map<String, Value>) -> Value {
    attributes.insert("doi".to_string(), Value::String(doi.as_str().to_string()));
    attributes.insert("event".to_string(), Value::String(event.to_string()));
    json!({
        "data": {
            "id": doi.as_str(),
            "type": "dois",
            "attributes": attributes,
        }
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a response body as JSON, falling back to text.
fn parse_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, RegistryError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| RegistryError::transport("response size limit exceeds u64"))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(RegistryError::transport("registry response exceeds size limit"));
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle
        .read_to_end(&mut buf)
        .map_err(|err| RegistryError::transport(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(RegistryError::transport("registry response exceeds size limit"));
    }
    Ok(buf)
}
