//! # Client Pool
//!
//! One registry client per distinct [`EndpointKey`], built lazily through a
//! [`RegistryClientFactory`].

use crate::controller::reconciler::store::ClusterStore;
use crate::observability::metrics;
use crate::registry::cache::CachingRegistryClient;
use crate::registry::client::{RegistryClient, RegistryError};
use crate::registry::endpoint::{EndpointKey, ResolvedEndpoint};
use crate::registry::http::{HttpOptions, HttpRegistryClient};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

/// Builds the client for one endpoint
///
/// Tests substitute their own factory to hand the engine a fake registry.
#[async_trait]
pub trait RegistryClientFactory: Send + Sync {
    async fn build(&self, endpoint: &ResolvedEndpoint) -> Result<Arc<dyn RegistryClient>, RegistryError>;
}

/// Production factory: HTTP client wrapped in the list cache
pub struct HttpClientFactory {
    store: Arc<dyn ClusterStore>,
    options: HttpOptions,
    list_cache_ttl: Duration,
    /// Bearer token for every endpoint, taking precedence over secret references
    api_key_override: Option<String>,
}

impl std::fmt::Debug for HttpClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientFactory")
            .field("list_cache_ttl", &self.list_cache_ttl)
            .field("api_key_override", &self.api_key_override.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpClientFactory {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        options: HttpOptions,
        list_cache_ttl: Duration,
        api_key_override: Option<String>,
    ) -> Self {
        Self {
            store,
            options,
            list_cache_ttl,
            api_key_override: api_key_override.filter(|k| !k.is_empty()),
        }
    }

    async fn resolve_api_key(&self, endpoint: &ResolvedEndpoint) -> Result<Option<String>, RegistryError> {
        if let Some(key) = &self.api_key_override {
            return Ok(Some(key.clone()));
        }
        let Some(reference) = &endpoint.api_key_ref else {
            return Ok(None);
        };
        let namespace = reference.namespace.as_deref().unwrap_or_default();

        let secret = self
            .store
            .get_secret(namespace, &reference.name)
            .await
            .map_err(|e| RegistryError::ApiKeyLookup(e.to_string()))?
            .ok_or_else(|| {
                RegistryError::ApiKey(format!("secret {namespace}/{} does not exist", reference.name))
            })?;

        let value = secret
            .data
            .as_ref()
            .and_then(|data| data.get(&reference.key))
            .ok_or_else(|| {
                RegistryError::ApiKey(format!(
                    "key {} does not exist within secret {namespace}/{}",
                    reference.key, reference.name
                ))
            })?;
        Ok(Some(String::from_utf8_lossy(&value.0).into_owned()))
    }
}

#[async_trait]
impl RegistryClientFactory for HttpClientFactory {
    async fn build(&self, endpoint: &ResolvedEndpoint) -> Result<Arc<dyn RegistryClient>, RegistryError> {
        let api_key = self.resolve_api_key(endpoint).await?;
        let http = HttpRegistryClient::new(&endpoint.key, api_key, &self.options)?;
        info!(
            registry.url = %http.base_url(),
            "Created registry client"
        );
        Ok(Arc::new(CachingRegistryClient::new(
            Arc::new(http),
            self.list_cache_ttl,
        )))
    }
}

/// Registry clients keyed by endpoint configuration
///
/// The lock is held for the whole lookup-or-create, so concurrent reconciles of
/// resources sharing an endpoint never build two clients.
pub struct ClientPool {
    factory: Arc<dyn RegistryClientFactory>,
    clients: AsyncMutex<HashMap<EndpointKey, Arc<dyn RegistryClient>>>,
}

impl std::fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool").finish_non_exhaustive()
    }
}

impl ClientPool {
    pub fn new(factory: Arc<dyn RegistryClientFactory>) -> Self {
        Self {
            factory,
            clients: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Return the pooled client for `endpoint`, building it on first use
    ///
    /// Build failures are not cached.
    pub async fn get_or_create(
        &self,
        endpoint: &ResolvedEndpoint,
    ) -> Result<Arc<dyn RegistryClient>, RegistryError> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&endpoint.key) {
            return Ok(Arc::clone(client));
        }

        let client = self.factory.build(endpoint).await?;
        clients.insert(endpoint.key.clone(), Arc::clone(&client));
        metrics::set_pooled_registry_clients(clients.len());
        Ok(client)
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }
}
