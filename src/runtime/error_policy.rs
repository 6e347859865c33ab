//! # Error Policy
//!
//! Backoff for reconciliations that returned a transient error.

use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError, ResourceKey};
use crate::crd::OAuth2Client;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing resource does not
/// slow down retries of another. A successful pass resets it.
pub fn handle_reconciliation_error(
    obj: Arc<OAuth2Client>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let key = ResourceKey::of(&obj);

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = %key.name,
        resource.namespace = %key.namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {}", key, error);
    observability::metrics::increment_reconciliation_errors();

    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(key.to_string()).or_insert_with(|| {
                BackoffState::new(ctx.config.backoff_min_secs, ctx.config.backoff_max_secs)
            });
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!(
                "Failed to lock backoff_states: {}, using minimum backoff",
                e
            );
            (ctx.config.backoff_min_secs.max(1), 0)
        }
    };

    info!(
        retry.seconds = backoff_seconds,
        error.count = error_count,
        "Retrying with Fibonacci backoff"
    );
    Action::requeue(Duration::from_secs(backoff_seconds))
}
