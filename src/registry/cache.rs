//! # List Cache
//!
//! Short-lived cache over [`RegistryClient::list`] for one endpoint.
//!
//! Many resources list the same endpoint within seconds of each other (stale
//! record sweeps, unregistration). The cache holds a single
//! `(snapshot, expires_at)` entry. Every create, update and delete drops the
//! entry once the registry has answered, so a later `list` always goes back to
//! the registry.
//!
//! A list that was in flight while a mutation completed must not repopulate
//! the cache with its pre-mutation answer. Mutations bump an epoch counter and a
//! list only stores its result when the epoch it started under is still current.

use crate::observability::metrics;
use crate::registry::client::{RegistryClient, RegistryError};
use crate::registry::types::OAuth2ClientRecord;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct ListCacheEntry {
    snapshot: Vec<OAuth2ClientRecord>,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<ListCacheEntry>,
    epoch: u64,
}

/// [`RegistryClient`] decorator caching `list` results for `ttl`
pub struct CachingRegistryClient {
    inner: Arc<dyn RegistryClient>,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for CachingRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingRegistryClient")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CachingRegistryClient {
    pub fn new(inner: Arc<dyn RegistryClient>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn invalidate(&self) {
        let mut state = self.state();
        state.entry = None;
        state.epoch = state.epoch.wrapping_add(1);
    }
}

#[async_trait]
impl RegistryClient for CachingRegistryClient {
    async fn get(&self, id: &str) -> Result<Option<OAuth2ClientRecord>, RegistryError> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<OAuth2ClientRecord>, RegistryError> {
        let epoch = {
            let state = self.state();
            if let Some(entry) = &state.entry {
                if Instant::now() < entry.expires_at {
                    metrics::increment_list_cache_hits();
                    debug!(records = entry.snapshot.len(), "Registry list served from cache");
                    return Ok(entry.snapshot.clone());
                }
            }
            state.epoch
        };

        metrics::increment_list_cache_misses();
        let records = self.inner.list().await?;

        let mut state = self.state();
        if state.epoch == epoch && !self.ttl.is_zero() {
            state.entry = Some(ListCacheEntry {
                snapshot: records.clone(),
                expires_at: Instant::now() + self.ttl,
            });
        }
        Ok(records)
    }

    async fn create(&self, record: &OAuth2ClientRecord) -> Result<OAuth2ClientRecord, RegistryError> {
        let result = self.inner.create(record).await;
        self.invalidate();
        result
    }

    async fn update(&self, record: &OAuth2ClientRecord) -> Result<OAuth2ClientRecord, RegistryError> {
        let result = self.inner.update(record).await;
        self.invalidate();
        result
    }

    async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        let result = self.inner.delete(id).await;
        self.invalidate();
        result
    }
}
