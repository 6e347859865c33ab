//! # Reconcile
//!
//! One reconciliation pass for an `OAuth2Client`:
//!
//! 1. Load the resource; a resource that no longer exists has nothing left to clean up
//! 2. Skip namespaces outside the configured filter
//! 3. Attach the finalizer to live resources
//! 4. Resources pending deletion: unregister, then release the finalizer
//! 5. No credential Secret: register without credentials and store what the registry generated
//! 6. Parse the credential Secret
//! 7. Resolve the pooled registry client for the resource's endpoint
//! 8. Stop if the generation was already handled; otherwise create, update,
//!    or reject (ownership conflict) the registry record
//!
//! Transient failures are returned for retry with backoff. Policy failures are
//! recorded in status and the pass ends without requeue.

use crate::constants::FINALIZER_NAME;
use crate::controller::reconciler::credentials::{credentials_secret, parse_secret};
use crate::controller::reconciler::finalize::{sweep_owned, unregister};
use crate::controller::reconciler::status::{ready_status, record_terminal, write_status};
use crate::controller::reconciler::store::StoreError;
use crate::controller::reconciler::types::{Lifecycle, Reconciler, ReconcilerError, ResourceKey};
use crate::crd::{OAuth2Client, StatusCode};
use crate::observability::metrics;
use crate::registry::{owner_of, resolve_endpoint, to_record, with_credentials, RegistryClient, RegistryError};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

/// Why a pass stopped early
enum Halt {
    /// Return to the runtime for retry with backoff
    Retry(ReconcilerError),
    /// Record in status and wait for a change
    Terminal { code: StatusCode, description: String },
}

impl Halt {
    fn terminal(code: StatusCode, description: impl ToString) -> Self {
        Self::Terminal {
            code,
            description: description.to_string(),
        }
    }
}

impl From<StoreError> for Halt {
    fn from(e: StoreError) -> Self {
        Self::Retry(e.into())
    }
}

impl From<RegistryError> for Halt {
    fn from(e: RegistryError) -> Self {
        Self::Retry(e.into())
    }
}

/// Controller entry point: wraps [`reconcile_key`] with span, metrics and backoff reset
pub async fn reconcile(obj: Arc<OAuth2Client>, ctx: Arc<Reconciler>) -> Result<Action, ReconcilerError> {
    let key = ResourceKey::of(&obj);
    let span = info_span!(
        "reconcile",
        resource.namespace = %key.namespace,
        resource.name = %key.name
    );

    async move {
        metrics::increment_reconciliations();
        let start = Instant::now();
        let result = reconcile_key(&key, &ctx).await;
        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        if result.is_ok() {
            if let Ok(mut states) = ctx.backoff_states.lock() {
                if let Some(state) = states.get_mut(&key.to_string()) {
                    state.reset();
                }
            }
        }
        result
    }
    .instrument(span)
    .await
}

/// Run one full pass for the resource identified by `key`
pub async fn reconcile_key(key: &ResourceKey, ctx: &Reconciler) -> Result<Action, ReconcilerError> {
    let Some(client) = ctx.store.get_client(&key.namespace, &key.name).await? else {
        // Unregistering here would be a no-op: with the object gone its secret name is empty
        debug!("OAuth2Client no longer exists, nothing to unregister");
        return Ok(Action::await_change());
    };

    if !ctx.config.namespace_allowed(&key.namespace) {
        debug!("Namespace not watched, ignoring");
        return Ok(Action::await_change());
    }

    match sync(&client, ctx).await {
        Ok(action) => Ok(action),
        Err(Halt::Retry(e)) => Err(e),
        Err(Halt::Terminal { code, description }) => {
            record_terminal(ctx.store.as_ref(), &client, code, &description).await?;
            Ok(Action::await_change())
        }
    }
}

async fn sync(client: &OAuth2Client, ctx: &Reconciler) -> Result<Action, Halt> {
    match Lifecycle::of(client) {
        Lifecycle::Active {
            finalizer_attached: false,
        } => {
            let mut finalizers = client.finalizers().to_vec();
            finalizers.push(FINALIZER_NAME.to_string());
            ctx.store.replace_finalizers(client, finalizers).await?;
            debug!("Attached finalizer");
        }
        Lifecycle::Active {
            finalizer_attached: true,
        } => {}
        Lifecycle::PendingFinalization { finalizer_attached } => {
            if finalizer_attached {
                finalize(client, ctx).await?;
            }
            return Ok(Action::await_change());
        }
    }

    let namespace = client.namespace().unwrap_or_default();
    let Some(secret) = ctx
        .store
        .get_secret(&namespace, &client.spec.secret_name)
        .await?
    else {
        return register_new(client, ctx).await;
    };

    let credentials = parse_secret(
        &secret,
        &ctx.config.secret_keys,
        client.spec.token_endpoint_auth_method,
    )
    .map_err(|e| {
        Halt::terminal(
            StatusCode::InvalidSecret,
            format!(
                "secret {namespace}/{} is invalid: {e}",
                client.spec.secret_name
            ),
        )
    })?;
    let client_id = credentials.id_str();

    let registry = registry_for(client, ctx).await?;
    let owner = owner_of(client);

    match registry.get(&client_id).await? {
        None => {
            let record = to_record(client)
                .map_err(|e| Halt::terminal(StatusCode::RegistrationFailed, e))?;
            sweep_owned(registry.as_ref(), &owner, Some(&client_id)).await?;
            registry
                .create(&with_credentials(record, &credentials))
                .await
                .map_err(|e| Halt::terminal(StatusCode::RegistrationFailed, e))?;
            info!(client.id = %client_id, "Registered client with provided credentials");
        }
        Some(_) if generation_observed(client) => {
            debug!("Generation already reconciled, nothing to do");
            return Ok(Action::requeue(ctx.config.sync_period));
        }
        Some(found) if found.owner != owner => {
            return Err(Halt::terminal(
                StatusCode::InvalidSecret,
                format!(
                    "ID provided in secret {namespace}/{} is assigned to another resource",
                    client.spec.secret_name
                ),
            ));
        }
        Some(_) => {
            let record =
                to_record(client).map_err(|e| Halt::terminal(StatusCode::UpdateFailed, e))?;
            registry
                .update(&with_credentials(record, &credentials))
                .await
                .map_err(|e| Halt::terminal(StatusCode::UpdateFailed, e))?;
            info!(client.id = %client_id, "Updated registry record");
        }
    }

    write_status(ctx.store.as_ref(), client, ready_status(client)).await?;
    Ok(Action::requeue(ctx.config.sync_period))
}

/// Current generation was already handled, successfully or with a terminal error
fn generation_observed(client: &OAuth2Client) -> bool {
    client.metadata.generation.is_some()
        && client
            .status
            .as_ref()
            .is_some_and(|s| s.observed_generation == client.metadata.generation)
}

/// Register without credentials and store the generated ones in a new Secret
async fn register_new(client: &OAuth2Client, ctx: &Reconciler) -> Result<Action, Halt> {
    let registry = registry_for(client, ctx).await?;
    let record =
        to_record(client).map_err(|e| Halt::terminal(StatusCode::RegistrationFailed, e))?;

    sweep_owned(registry.as_ref(), &owner_of(client), None).await?;

    let created = registry
        .create(&record)
        .await
        .map_err(|e| Halt::terminal(StatusCode::RegistrationFailed, e))?;

    let secret = credentials_secret(client, &ctx.config.secret_keys, &created)
        .map_err(|e| Halt::terminal(StatusCode::SecretCreationFailed, e))?;
    ctx.store
        .create_secret(&secret)
        .await
        .map_err(|e| Halt::terminal(StatusCode::SecretCreationFailed, e))?;
    info!(
        client.id = created.client_id.as_deref().unwrap_or_default(),
        secret.name = %client.spec.secret_name,
        "Registered client and stored generated credentials"
    );

    write_status(ctx.store.as_ref(), client, ready_status(client)).await?;
    Ok(Action::requeue(ctx.config.sync_period))
}

/// Unregister owned records, then release the finalizer
async fn finalize(client: &OAuth2Client, ctx: &Reconciler) -> Result<(), Halt> {
    // Without a secret name nothing was ever registered for this resource
    if !client.spec.secret_name.is_empty() {
        let registry = registry_for(client, ctx).await?;
        let deleted = unregister(
            registry.as_ref(),
            &owner_of(client),
            client.spec.deletion_policy,
        )
        .await?;
        info!(records = deleted, "Unregistered client");
    }

    let finalizers = client
        .finalizers()
        .iter()
        .filter(|f| f.as_str() != FINALIZER_NAME)
        .cloned()
        .collect();
    ctx.store.replace_finalizers(client, finalizers).await?;
    debug!("Released finalizer");

    if let Ok(mut states) = ctx.backoff_states.lock() {
        states.remove(&ResourceKey::of(client).to_string());
    }
    Ok(())
}

/// Pooled registry client for the resource's effective endpoint
async fn registry_for(client: &OAuth2Client, ctx: &Reconciler) -> Result<Arc<dyn RegistryClient>, Halt> {
    let namespace = client.namespace().unwrap_or_default();
    let endpoint = resolve_endpoint(
        &ctx.config.default_endpoint,
        client.spec.admin_endpoint.as_ref(),
        &namespace,
    )
    .map_err(|e| {
        if e.is_configuration() {
            error!(error = %e, "Controller misconfiguration: no usable registry endpoint");
        }
        Halt::terminal(StatusCode::InvalidEndpointAddress, e)
    })?;

    match ctx.pool.get_or_create(&endpoint).await {
        Ok(registry) => Ok(registry),
        Err(e @ RegistryError::ApiKeyLookup(_)) => Err(e.into()),
        Err(e) => Err(Halt::terminal(StatusCode::InvalidEndpointAddress, e)),
    }
}
