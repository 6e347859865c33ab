//! # OAuth2 Client Controller
//!
//! A Kubernetes controller that keeps `OAuth2Client` resources in sync with an
//! OAuth2 client registry admin API.
//!
//! ## Overview
//!
//! 1. **Registers clients** - Creates a registry record for every `OAuth2Client`
//! 2. **Stores credentials** - Generated client credentials land in a Secret owned by the resource
//! 3. **Keeps records current** - Spec changes are pushed to the registry
//! 4. **Cleans up** - A finalizer removes registry records on deletion (unless `deletionPolicy: orphan`)
//!
//! Endpoint flags are also readable from the environment; everything else is
//! configured through environment variables (see `config::ControllerConfig`).

use anyhow::Result;
use clap::Parser;
use oauth2_client_controller::config::{parse_duration, split_namespaces, ControllerConfig};
use oauth2_client_controller::runtime::{initialize, run_watch_loop};
use std::time::Duration;

/// OAuth2 Client Controller
#[derive(Parser, Debug)]
#[command(name = "oauth2-client-controller", version, about, long_about = None)]
struct Cli {
    /// Default registry admin URL (scheme and host)
    #[arg(long, env = "REGISTRY_URL")]
    registry_url: Option<String>,

    /// Default registry admin port
    #[arg(long, env = "REGISTRY_PORT")]
    registry_port: Option<u16>,

    /// Default registry clients endpoint
    #[arg(long, env = "REGISTRY_ENDPOINT")]
    endpoint: Option<String>,

    /// Default X-Forwarded-Proto header value (`http`, `https` or `off`)
    #[arg(long, env = "FORWARDED_PROTO")]
    forwarded_proto: Option<String>,

    /// Comma-separated namespaces to reconcile; all when unset
    #[arg(long, env = "NAMESPACES")]
    namespaces: Option<String>,

    /// Metrics and probe server port
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Resync period for reconciled resources (e.g. `10h`, `30m`)
    #[arg(long, env = "SYNC_PERIOD", value_parser = parse_sync_period)]
    sync_period: Option<Duration>,
}

impl Cli {
    fn apply(self, config: &mut ControllerConfig) {
        if let Some(url) = self.registry_url {
            config.registry_url = Some(url);
        }
        if let Some(port) = self.registry_port {
            config.registry_port = port;
        }
        if let Some(endpoint) = self.endpoint {
            config.registry_endpoint = endpoint;
        }
        if let Some(proto) = self.forwarded_proto {
            config.forwarded_proto = Some(proto);
        }
        if let Some(namespaces) = self.namespaces {
            config.namespaces = split_namespaces(&namespaces);
        }
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        if let Some(period) = self.sync_period {
            config.sync_period = period;
        }
    }
}

fn parse_sync_period(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = ControllerConfig::from_env()?;
    cli.apply(&mut config);

    let init = initialize(&config).await?;

    run_watch_loop(init.client, init.clients, init.reconciler, init.server_state).await
}
