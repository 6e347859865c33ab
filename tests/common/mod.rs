//! Common test utilities
//!
//! rustls setup for tests that open HTTP connections, plus in-memory fakes for
//! the cluster store and the registry so the engine can run without a cluster.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use oauth2_client_controller::controller::reconciler::{
    ClusterStore, Reconciler, ReconcilerConfig, ResourceKey, SecretKeys, StoreError,
};
use oauth2_client_controller::crd::{OAuth2Client, OAuth2ClientStatus};
use oauth2_client_controller::registry::{
    EndpointDefaults, OAuth2ClientRecord, RegistryClient, RegistryClientFactory, RegistryError,
    ResolvedEndpoint,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Build an `OAuth2Client` in `default` from a spec literal
pub fn oauth2_client(name: &str, generation: i64, spec: serde_json::Value) -> OAuth2Client {
    serde_json::from_value(serde_json::json!({
        "apiVersion": "oauth2.octopilot.io/v1alpha1",
        "kind": "OAuth2Client",
        "metadata": {
            "name": name,
            "namespace": "default",
            "uid": format!("uid-{name}"),
            "generation": generation,
            "resourceVersion": "1"
        },
        "spec": spec
    }))
    .expect("valid OAuth2Client")
}

pub fn secret(namespace: &str, name: &str, entries: &[(&str, &str)]) -> Secret {
    serde_json::from_value(serde_json::json!({
        "metadata": {"name": name, "namespace": namespace}
    }))
    .map(|mut s: Secret| {
        s.data = Some(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        );
        s
    })
    .expect("valid Secret")
}

pub fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(|v| String::from_utf8_lossy(&v.0).into_owned())
}

/// In-memory cluster: objects, secrets, and a log of status writes
#[derive(Default)]
pub struct FakeStore {
    clients: Mutex<HashMap<(String, String), OAuth2Client>>,
    secrets: Mutex<HashMap<(String, String), Secret>>,
    pub status_writes: AtomicUsize,
    pub finalizer_writes: AtomicUsize,
    pub fail_secret_create: AtomicBool,
    pub fail_secret_reads: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_client(&self, client: OAuth2Client) {
        let key = (client.namespace().unwrap_or_default(), client.name_any());
        self.clients.lock().unwrap().insert(key, client);
    }

    pub fn insert_secret(&self, secret: Secret) {
        let key = (secret.namespace().unwrap_or_default(), secret.name_any());
        self.secrets.lock().unwrap().insert(key, secret);
    }

    pub fn client(&self, namespace: &str, name: &str) -> Option<OAuth2Client> {
        self.clients
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn stored_secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn status(&self, namespace: &str, name: &str) -> Option<OAuth2ClientStatus> {
        self.client(namespace, name).and_then(|c| c.status)
    }

    /// Apply a spec change the way the API server does: new spec, next generation
    pub fn update_spec(&self, namespace: &str, name: &str, spec: serde_json::Value) {
        let mut clients = self.clients.lock().unwrap();
        let client = clients
            .get_mut(&(namespace.to_string(), name.to_string()))
            .expect("client exists");
        client.spec = serde_json::from_value(spec).expect("valid spec");
        client.metadata.generation = client.metadata.generation.map(|g| g + 1);
    }

    /// Mark the object for deletion; it disappears once its finalizers are gone
    pub fn mark_deleted(&self, namespace: &str, name: &str) {
        let mut clients = self.clients.lock().unwrap();
        let key = (namespace.to_string(), name.to_string());
        let client = clients.get(&key).cloned().expect("client exists");
        if client.finalizers().is_empty() {
            clients.remove(&key);
            return;
        }
        let mut value = serde_json::to_value(&client).unwrap();
        value["metadata"]["deletionTimestamp"] = serde_json::json!("2024-01-01T00:00:00Z");
        clients.insert(key, serde_json::from_value(value).unwrap());
    }
}

#[async_trait]
impl ClusterStore for FakeStore {
    async fn get_client(&self, namespace: &str, name: &str) -> Result<Option<OAuth2Client>, StoreError> {
        Ok(self.client(namespace, name))
    }

    async fn replace_finalizers(
        &self,
        client: &OAuth2Client,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError> {
        self.finalizer_writes.fetch_add(1, Ordering::SeqCst);
        let key = (client.namespace().unwrap_or_default(), client.name_any());
        let mut clients = self.clients.lock().unwrap();
        let Some(stored) = clients.get_mut(&key) else {
            return Err(StoreError::Other("not found".to_string()));
        };
        if finalizers.is_empty() && stored.metadata.deletion_timestamp.is_some() {
            clients.remove(&key);
        } else {
            stored.metadata.finalizers = Some(finalizers);
        }
        Ok(())
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &OAuth2ClientStatus,
    ) -> Result<(), StoreError> {
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        let mut clients = self.clients.lock().unwrap();
        let stored = clients
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| StoreError::Other("not found".to_string()))?;
        stored.status = Some(status.clone());
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        if self.fail_secret_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Other("secrets unavailable".to_string()));
        }
        Ok(self.stored_secret(namespace, name))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        if self.fail_secret_create.load(Ordering::SeqCst) {
            return Err(StoreError::Other("secret create forbidden".to_string()));
        }
        let key = (secret.namespace().unwrap_or_default(), secret.name_any());
        let mut secrets = self.secrets.lock().unwrap();
        if secrets.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: "Secret",
                namespace: key.0,
                name: key.1,
            });
        }
        secrets.insert(key, secret.clone());
        Ok(())
    }
}

/// In-memory registry that counts every call
#[derive(Default)]
pub struct RecordingRegistry {
    records: Mutex<BTreeMap<String, OAuth2ClientRecord>>,
    next_id: AtomicUsize,
    pub gets: AtomicUsize,
    pub lists: AtomicUsize,
    pub creates: Mutex<Vec<OAuth2ClientRecord>>,
    pub updates: Mutex<Vec<OAuth2ClientRecord>>,
    pub deletes: Mutex<Vec<String>>,
    pub unavailable: AtomicBool,
    /// Reject every update with 400
    pub reject_updates: AtomicBool,
}

impl RecordingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, record: OAuth2ClientRecord) {
        let id = record.client_id.clone().expect("seeded record has an id");
        self.records.lock().unwrap().insert(id, record);
    }

    pub fn records(&self) -> Vec<OAuth2ClientRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    pub fn record(&self, id: &str) -> Option<OAuth2ClientRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn create_count(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.lock().unwrap().len()
    }

    fn check_available(&self) -> Result<(), RegistryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(RegistryError::UnexpectedStatus {
                method: "GET",
                url: "http://registry-admin:4445/clients".to_string(),
                status: "503 Service Unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RegistryClient for RecordingRegistry {
    async fn get(&self, id: &str) -> Result<Option<OAuth2ClientRecord>, RegistryError> {
        self.check_available()?;
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.record(id))
    }

    async fn list(&self) -> Result<Vec<OAuth2ClientRecord>, RegistryError> {
        self.check_available()?;
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.records())
    }

    async fn create(&self, record: &OAuth2ClientRecord) -> Result<OAuth2ClientRecord, RegistryError> {
        self.check_available()?;
        self.creates.lock().unwrap().push(record.clone());

        let mut created = record.clone();
        if created.client_id.is_none() {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            created.client_id = Some(format!("generated-{n}"));
            if created.token_endpoint_auth_method.as_deref() != Some("none") {
                created.client_secret = Some(format!("generated-secret-{n}"));
            }
        }
        let id = created.client_id.clone().unwrap_or_default();

        let mut records = self.records.lock().unwrap();
        if records.contains_key(&id) {
            return Err(RegistryError::AlreadyExists {
                method: "POST",
                url: "http://registry-admin:4445/clients".to_string(),
            });
        }
        let mut stored = created.clone();
        stored.client_secret = None;
        records.insert(id, stored);
        Ok(created)
    }

    async fn update(&self, record: &OAuth2ClientRecord) -> Result<OAuth2ClientRecord, RegistryError> {
        self.check_available()?;
        self.updates.lock().unwrap().push(record.clone());
        if self.reject_updates.load(Ordering::SeqCst) {
            return Err(RegistryError::UnexpectedStatus {
                method: "PUT",
                url: "http://registry-admin:4445/clients".to_string(),
                status: "400 Bad Request".to_string(),
            });
        }
        let id = record.client_id.clone().ok_or(RegistryError::MissingClientId)?;
        let mut stored = record.clone();
        stored.client_secret = None;
        self.records.lock().unwrap().insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        self.check_available()?;
        self.deletes.lock().unwrap().push(id.to_string());
        self.records.lock().unwrap().remove(id);
        Ok(())
    }
}

/// Factory handing out one shared registry for every endpoint
pub struct StaticFactory {
    registry: Arc<RecordingRegistry>,
    pub endpoints: Mutex<Vec<ResolvedEndpoint>>,
}

impl StaticFactory {
    pub fn new(registry: Arc<RecordingRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            endpoints: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl RegistryClientFactory for StaticFactory {
    async fn build(&self, endpoint: &ResolvedEndpoint) -> Result<Arc<dyn RegistryClient>, RegistryError> {
        self.endpoints.lock().unwrap().push(endpoint.clone());
        Ok(Arc::clone(&self.registry) as Arc<dyn RegistryClient>)
    }
}

pub fn reconciler_config() -> ReconcilerConfig {
    ReconcilerConfig {
        secret_keys: SecretKeys::default(),
        namespaces: Vec::new(),
        default_endpoint: EndpointDefaults {
            url: Some("http://registry-admin".to_string()),
            port: 4445,
            endpoint: "/clients".to_string(),
            forwarded_proto: None,
        },
        sync_period: Duration::from_secs(600),
        backoff_min_secs: 5,
        backoff_max_secs: 300,
    }
}

/// Engine wired to the fakes
pub struct Harness {
    pub store: Arc<FakeStore>,
    pub registry: Arc<RecordingRegistry>,
    pub factory: Arc<StaticFactory>,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(reconciler_config())
    }

    pub fn with_config(config: ReconcilerConfig) -> Self {
        let store = FakeStore::new();
        let registry = RecordingRegistry::new();
        let factory = StaticFactory::new(Arc::clone(&registry));
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store) as Arc<dyn ClusterStore>,
            Arc::clone(&factory) as Arc<dyn RegistryClientFactory>,
            config,
        ));
        Self {
            store,
            registry,
            factory,
            reconciler,
        }
    }

    pub fn key(name: &str) -> ResourceKey {
        ResourceKey::new("default", name)
    }
}
