//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::config::duration::parse_duration;
use crate::controller::reconciler::{ReconcilerConfig, SecretKeys};
use crate::registry::{EndpointDefaults, HttpOptions};
use anyhow::{Context, Result};
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Registry endpoint settings can additionally be overridden by command-line flags.
#[derive(Clone)]
pub struct ControllerConfig {
    /// Default registry base URL; `None` means every resource must set `adminEndpoint.url`
    pub registry_url: Option<String>,
    pub registry_port: u16,
    /// Registry clients sub-path
    pub registry_endpoint: String,
    /// Default `X-Forwarded-Proto` header value
    pub forwarded_proto: Option<String>,
    /// Namespaces to reconcile; empty means all
    pub namespaces: Vec<String>,
    /// Requeue interval after a successful pass
    pub sync_period: Duration,
    /// Data key of the client id inside credential secrets
    pub client_id_key: String,
    /// Data key of the client secret inside credential secrets
    pub client_secret_key: String,
    /// Bearer token sent to every registry endpoint
    pub registry_api_key: Option<String>,
    /// List cache time-to-live (seconds); 0 disables caching
    pub list_cache_ttl_secs: u64,
    pub registry_request_timeout_secs: u64,
    /// Path of a PEM bundle with additional trusted roots for the registry
    pub tls_trust_store: Option<String>,
    pub tls_insecure_skip_verify: bool,
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,
    pub metrics_port: u16,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("registry_url", &self.registry_url)
            .field("registry_port", &self.registry_port)
            .field("registry_endpoint", &self.registry_endpoint)
            .field("forwarded_proto", &self.forwarded_proto)
            .field("namespaces", &self.namespaces)
            .field("sync_period", &self.sync_period)
            .field("client_id_key", &self.client_id_key)
            .field("client_secret_key", &self.client_secret_key)
            .field(
                "registry_api_key",
                &self.registry_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("list_cache_ttl_secs", &self.list_cache_ttl_secs)
            .field(
                "registry_request_timeout_secs",
                &self.registry_request_timeout_secs,
            )
            .field("tls_trust_store", &self.tls_trust_store)
            .field("tls_insecure_skip_verify", &self.tls_insecure_skip_verify)
            .field("backoff_min_secs", &self.backoff_min_secs)
            .field("backoff_max_secs", &self.backoff_max_secs)
            .field("metrics_port", &self.metrics_port)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            registry_url: None,
            registry_port: DEFAULT_REGISTRY_PORT,
            registry_endpoint: DEFAULT_REGISTRY_ENDPOINT.to_string(),
            forwarded_proto: None,
            namespaces: Vec::new(),
            sync_period: Duration::from_secs(DEFAULT_SYNC_PERIOD_SECS),
            client_id_key: DEFAULT_CLIENT_ID_KEY.to_string(),
            client_secret_key: DEFAULT_CLIENT_SECRET_KEY.to_string(),
            registry_api_key: None,
            list_cache_ttl_secs: DEFAULT_LIST_CACHE_TTL_SECS,
            registry_request_timeout_secs: DEFAULT_REGISTRY_REQUEST_TIMEOUT_SECS,
            tls_trust_store: None,
            tls_insecure_skip_verify: false,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
            log_format: LogFormat::Json,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Result<Self> {
        use crate::constants::*;
        let sync_period = match env_var_opt("SYNC_PERIOD") {
            Some(value) => parse_duration(&value).context("Invalid SYNC_PERIOD")?,
            None => Duration::from_secs(DEFAULT_SYNC_PERIOD_SECS),
        };

        Ok(Self {
            registry_url: env_var_opt("REGISTRY_URL"),
            registry_port: env_var_or_default("REGISTRY_PORT", DEFAULT_REGISTRY_PORT),
            registry_endpoint: env_var_or_default_str(
                "REGISTRY_ENDPOINT",
                DEFAULT_REGISTRY_ENDPOINT,
            ),
            forwarded_proto: env_var_opt("FORWARDED_PROTO"),
            namespaces: env_var_opt("NAMESPACES")
                .map(|v| split_namespaces(&v))
                .unwrap_or_default(),
            sync_period,
            client_id_key: env_var_or_default_str("CLIENT_ID_KEY", DEFAULT_CLIENT_ID_KEY),
            client_secret_key: env_var_or_default_str(
                "CLIENT_SECRET_KEY",
                DEFAULT_CLIENT_SECRET_KEY,
            ),
            registry_api_key: env_var_opt(REGISTRY_API_KEY_ENV),
            list_cache_ttl_secs: env_var_or_default(
                "LIST_CACHE_TTL_SECS",
                DEFAULT_LIST_CACHE_TTL_SECS,
            ),
            registry_request_timeout_secs: env_var_or_default(
                "REGISTRY_REQUEST_TIMEOUT_SECS",
                DEFAULT_REGISTRY_REQUEST_TIMEOUT_SECS,
            ),
            tls_trust_store: env_var_opt("TLS_TRUST_STORE"),
            tls_insecure_skip_verify: env_var_or_default_bool("TLS_INSECURE_SKIP_VERIFY", false),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            log_format: LogFormat::parse(&env_var_or_default_str("LOG_FORMAT", "json")),
        })
    }

    /// Get list cache TTL duration
    pub fn list_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.list_cache_ttl_secs)
    }

    /// Get registry request timeout duration
    pub fn registry_request_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_request_timeout_secs)
    }

    pub fn secret_keys(&self) -> SecretKeys {
        SecretKeys {
            client_id: self.client_id_key.clone(),
            client_secret: self.client_secret_key.clone(),
        }
    }

    pub fn endpoint_defaults(&self) -> EndpointDefaults {
        EndpointDefaults {
            url: self.registry_url.clone(),
            port: self.registry_port,
            endpoint: self.registry_endpoint.clone(),
            forwarded_proto: self.forwarded_proto.clone(),
        }
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            secret_keys: self.secret_keys(),
            namespaces: self.namespaces.clone(),
            default_endpoint: self.endpoint_defaults(),
            sync_period: self.sync_period,
            backoff_min_secs: self.backoff_min_secs,
            backoff_max_secs: self.backoff_max_secs,
        }
    }

    /// Transport options for registry clients; reads the trust store file if configured
    pub fn http_options(&self) -> Result<HttpOptions> {
        let trust_store_pem = self
            .tls_trust_store
            .as_deref()
            .map(|path| {
                std::fs::read(path).with_context(|| format!("Failed to read trust store {path}"))
            })
            .transpose()?;

        Ok(HttpOptions {
            request_timeout: self.registry_request_timeout(),
            trust_store_pem,
            insecure_skip_verify: self.tls_insecure_skip_verify,
        })
    }
}

/// Split a comma-separated namespace list, dropping blanks
pub fn split_namespaces(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read environment variable, treating empty as unset
fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
