//! Registry client trait and errors.

use crate::registry::types::OAuth2ClientRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Registry admin API failures
///
/// All variants are transient from the engine's point of view unless the
/// engine maps them to a terminal status code (create/update failures).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{method} {url} http request returned unexpected status code {status}")]
    UnexpectedStatus {
        method: &'static str,
        url: String,
        status: String,
    },
    #[error("{method} {url} http request failed: requested ID already exists")]
    AlreadyExists { method: &'static str, url: String },
    #[error("{method} {url} http request failed: {source}")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned an undecodable body: {source}")]
    Decode {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("record has no client_id")]
    MissingClientId,
    #[error("invalid registry endpoint: {0}")]
    Endpoint(#[from] crate::registry::endpoint::EndpointError),
    #[error("registry API key unavailable: {0}")]
    ApiKey(String),
    #[error("failed to read registry API key secret: {0}")]
    ApiKeyLookup(String),
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// Operations against one registry endpoint
///
/// Implementations perform a single request per call with no internal retry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetch one record; `Ok(None)` when the registry reports not found or unauthorized
    async fn get(&self, id: &str) -> Result<Option<OAuth2ClientRecord>, RegistryError>;

    /// All records at this endpoint
    async fn list(&self) -> Result<Vec<OAuth2ClientRecord>, RegistryError>;

    /// Register a record; the response carries the generated id and secret
    async fn create(&self, record: &OAuth2ClientRecord) -> Result<OAuth2ClientRecord, RegistryError>;

    /// Replace the record addressed by `record.client_id`
    async fn update(&self, record: &OAuth2ClientRecord) -> Result<OAuth2ClientRecord, RegistryError>;

    /// Remove a record; a missing record counts as removed
    async fn delete(&self, id: &str) -> Result<(), RegistryError>;
}

impl std::fmt::Debug for dyn RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient").finish_non_exhaustive()
    }
}
