//! # Types
//!
//! Core types for the reconciler.

use crate::constants::{DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, FINALIZER_NAME};
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::store::{ClusterStore, StoreError};
use crate::crd::OAuth2Client;
use crate::registry::{ClientPool, EndpointDefaults, RegistryClientFactory, RegistryError};
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Failures returned to the controller runtime for retry with backoff
///
/// Terminal outcomes never surface here; they are written to the resource status.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Kubernetes store error: {0}")]
    Store(#[from] StoreError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Names of the data keys inside credential Secrets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretKeys {
    pub client_id: String,
    pub client_secret: String,
}

impl Default for SecretKeys {
    fn default() -> Self {
        Self {
            client_id: crate::constants::DEFAULT_CLIENT_ID_KEY.to_string(),
            client_secret: crate::constants::DEFAULT_CLIENT_SECRET_KEY.to_string(),
        }
    }
}

/// Engine settings, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub secret_keys: SecretKeys,
    /// Namespaces to reconcile; empty means all
    pub namespaces: Vec<String>,
    pub default_endpoint: EndpointDefaults,
    /// Requeue interval after a successful pass
    pub sync_period: Duration,
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,
}

impl ReconcilerConfig {
    pub fn namespace_allowed(&self, namespace: &str) -> bool {
        self.namespaces.is_empty() || self.namespaces.iter().any(|ns| ns == namespace)
    }
}

/// Deletion lifecycle of a resource, derived from its metadata at the I/O boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active { finalizer_attached: bool },
    PendingFinalization { finalizer_attached: bool },
}

impl Lifecycle {
    pub fn of(client: &OAuth2Client) -> Self {
        let finalizer_attached = client.finalizers().iter().any(|f| f == FINALIZER_NAME);
        if client.metadata.deletion_timestamp.is_some() {
            Self::PendingFinalization { finalizer_attached }
        } else {
            Self::Active { finalizer_attached }
        }
    }
}

/// Namespace and name of a resource; displays as `namespace/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of(client: &OAuth2Client) -> Self {
        Self::new(client.namespace().unwrap_or_default(), client.name_any())
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_MIN_SECS, DEFAULT_BACKOFF_MAX_SECS)
    }
}

/// Shared reconciliation context
pub struct Reconciler {
    pub store: Arc<dyn ClusterStore>,
    pub pool: ClientPool,
    pub config: ReconcilerConfig,
    // Backoff state per resource (identified by namespace/name)
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        factory: Arc<dyn RegistryClientFactory>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            pool: ClientPool::new(factory),
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }
}
