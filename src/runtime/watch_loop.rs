//! # Watch Loop
//!
//! Controller watch loop that monitors `OAuth2Client` resources and the
//! credential Secrets they own, triggering reconciliation on changes.

use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::OAuth2Client;
use crate::runtime::error_policy::handle_reconciliation_error;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{api::Api, Client};
use kube_runtime::{watcher, Controller};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Run the controller watch loop until a shutdown signal is received
pub async fn run_watch_loop(
    client: Client,
    clients: Api<OAuth2Client>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    // Mark not ready as soon as shutdown starts; in-flight reconciles still finish
    let shutdown_server_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
                shutdown_server_state.is_ready.store(false, Ordering::Relaxed);
            }
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let watch_span = tracing::span!(
        tracing::Level::INFO,
        "controller.watch",
        operation = "watch_loop"
    );

    let secrets: Api<Secret> = Api::all(client);

    info!("Starting controller watch loop...");
    Controller::new(clients, watcher::Config::default().any_semantic())
        .owns(secrets, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, reconciler)
        .for_each(|result| {
            match result {
                Ok((object, _action)) => {
                    debug!(
                        resource.namespace = object.namespace.as_deref().unwrap_or_default(),
                        resource.name = %object.name,
                        "watch.event.success"
                    );
                }
                Err(e) => warn!("Controller stream error: {}", e),
            }
            futures::future::ready(())
        })
        .instrument(watch_span)
        .await;

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("Controller stopped gracefully");
    Ok(())
}
