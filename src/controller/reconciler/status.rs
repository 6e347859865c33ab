//! # Status
//!
//! Builds and persists `OAuth2Client` status: observed generation, the terminal
//! reconciliation error, and the `Ready` condition.

use crate::controller::reconciler::store::{ClusterStore, StoreError};
use crate::crd::{Condition, ConditionStatus, OAuth2Client, OAuth2ClientStatus, ReconciliationError, StatusCode};
use crate::observability::metrics;
use kube::ResourceExt;
use tracing::{debug, warn};

const READY: &str = "Ready";

fn ready_condition(
    previous: Option<&OAuth2ClientStatus>,
    status: ConditionStatus,
    reason: &str,
    message: String,
) -> Condition {
    // Keep the transition time while the condition status is unchanged
    let last_transition_time = previous
        .and_then(|s| s.conditions.iter().find(|c| c.r#type == READY))
        .filter(|c| c.status == status)
        .and_then(|c| c.last_transition_time.clone())
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

    Condition {
        r#type: READY.to_string(),
        status,
        last_transition_time: Some(last_transition_time),
        reason: Some(reason.to_string()),
        message: Some(message),
    }
}

/// Status after a successful pass: error cleared, `Ready=True`
pub fn ready_status(client: &OAuth2Client) -> OAuth2ClientStatus {
    OAuth2ClientStatus {
        observed_generation: client.metadata.generation,
        reconciliation_error: None,
        conditions: vec![ready_condition(
            client.status.as_ref(),
            ConditionStatus::True,
            "Registered",
            "Client is registered and in sync".to_string(),
        )],
    }
}

/// Status recording a terminal error: `Ready=False` with the code as reason
pub fn terminal_status(client: &OAuth2Client, code: StatusCode, description: &str) -> OAuth2ClientStatus {
    OAuth2ClientStatus {
        observed_generation: client.metadata.generation,
        reconciliation_error: Some(ReconciliationError {
            status_code: code,
            description: description.to_string(),
        }),
        conditions: vec![ready_condition(
            client.status.as_ref(),
            ConditionStatus::False,
            code.as_str(),
            description.to_string(),
        )],
    }
}

/// Persist `status` unless it equals what the resource already carries
pub async fn write_status(
    store: &dyn ClusterStore,
    client: &OAuth2Client,
    status: OAuth2ClientStatus,
) -> Result<(), StoreError> {
    if client.status.as_ref() == Some(&status) {
        debug!("Status unchanged, skipping update");
        return Ok(());
    }
    store
        .patch_status(
            &client.namespace().unwrap_or_default(),
            &client.name_any(),
            &status,
        )
        .await
}

/// Record a terminal error on the resource
pub async fn record_terminal(
    store: &dyn ClusterStore,
    client: &OAuth2Client,
    code: StatusCode,
    description: &str,
) -> Result<(), StoreError> {
    warn!(
        status.code = %code,
        description,
        "Reconciliation stopped with terminal error"
    );
    metrics::increment_terminal_status(code.as_str());
    write_status(store, client, terminal_status(client, code, description)).await
}
