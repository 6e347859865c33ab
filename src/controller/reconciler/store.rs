//! # Cluster Store
//!
//! The engine's view of the Kubernetes API: `OAuth2Client` reads and writes
//! plus the credential Secrets. [`KubeStore`] is the production implementation
//! over `kube::Api`.

use crate::constants::CONTROLLER_NAME;
use crate::crd::{OAuth2Client, OAuth2ClientStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic-concurrency failure; retry with a fresh read
    #[error("{kind} {namespace}/{name} was modified concurrently")]
    Conflict {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("{0}")]
    Other(String),
}

/// Kubernetes operations used by the reconciler
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch an `OAuth2Client`; `Ok(None)` when it does not exist
    async fn get_client(&self, namespace: &str, name: &str) -> Result<Option<OAuth2Client>, StoreError>;

    /// Replace the finalizer list, conditional on the resource version read
    async fn replace_finalizers(
        &self,
        client: &OAuth2Client,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError>;

    /// Merge-patch the status subresource
    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &OAuth2ClientStatus,
    ) -> Result<(), StoreError>;

    /// Fetch a Secret; `Ok(None)` when it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError>;

    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError>;
}

/// [`ClusterStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn is_status(error: &kube::Error, code: u16) -> bool {
    matches!(error, kube::Error::Api(e) if e.code == code)
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_client(&self, namespace: &str, name: &str) -> Result<Option<OAuth2Client>, StoreError> {
        let api: Api<OAuth2Client> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn replace_finalizers(
        &self,
        client: &OAuth2Client,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError> {
        let namespace = client.namespace().unwrap_or_default();
        let name = client.name_any();
        let api: Api<OAuth2Client> = Api::namespaced(self.client.clone(), &namespace);

        // resourceVersion in a merge patch turns it into a conditional update
        let patch = json!({
            "metadata": {
                "resourceVersion": client.resource_version(),
                "finalizers": finalizers,
            }
        });
        match api
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_status(&e, 409) => Err(StoreError::Conflict {
                kind: "OAuth2Client",
                namespace,
                name,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &OAuth2ClientStatus,
    ) -> Result<(), StoreError> {
        let api: Api<OAuth2Client> = Api::namespaced(self.client.clone(), namespace);
        let mut status_value =
            serde_json::to_value(status).map_err(|e| StoreError::Other(e.to_string()))?;
        // A merge patch only removes fields that are explicitly null
        if status.reconciliation_error.is_none() {
            status_value["reconciliationError"] = serde_json::Value::Null;
        }
        let patch = json!({ "status": status_value });
        api.patch_status(
            name,
            &PatchParams::apply(CONTROLLER_NAME),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let namespace = secret.namespace().unwrap_or_default();
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        match api.create(&PostParams::default(), secret).await {
            Ok(_) => Ok(()),
            Err(e) if is_status(&e, 409) => Err(StoreError::AlreadyExists {
                kind: "Secret",
                namespace,
                name: secret.name_any(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
