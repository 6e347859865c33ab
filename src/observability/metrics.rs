//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `oauth2_client_reconciliations_total` - Total number of reconciliations
//! - `oauth2_client_reconciliation_errors_total` - Reconciliations returned for retry
//! - `oauth2_client_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `oauth2_client_terminal_status_total` - Terminal statuses recorded, by status code
//! - `oauth2_client_registry_requests_total` - Registry requests by operation and outcome
//! - `oauth2_client_registry_request_duration_seconds` - Registry request duration by operation
//! - `oauth2_client_list_cache_hits_total` / `_misses_total` - List cache effectiveness
//! - `oauth2_client_pooled_registry_clients` - Registry clients held by the pool

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "oauth2_client_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "oauth2_client_reconciliation_errors_total",
        "Total number of reconciliations returned for retry",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "oauth2_client_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static TERMINAL_STATUS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "oauth2_client_terminal_status_total",
            "Total number of terminal reconciliation errors recorded in status, by code",
        ),
        &["code"],
    )
    .expect("Failed to create TERMINAL_STATUS_TOTAL metric - this should never happen")
});

static REGISTRY_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "oauth2_client_registry_requests_total",
            "Total number of registry admin API requests by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create REGISTRY_REQUESTS_TOTAL metric - this should never happen")
});

static REGISTRY_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "oauth2_client_registry_request_duration_seconds",
            "Duration of registry admin API requests in seconds by operation",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["operation"],
    )
    .expect("Failed to create REGISTRY_REQUEST_DURATION metric - this should never happen")
});

static LIST_CACHE_HITS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "oauth2_client_list_cache_hits_total",
        "Total number of registry list calls served from cache",
    )
    .expect("Failed to create LIST_CACHE_HITS_TOTAL metric - this should never happen")
});

static LIST_CACHE_MISSES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "oauth2_client_list_cache_misses_total",
        "Total number of registry list calls that reached the registry",
    )
    .expect("Failed to create LIST_CACHE_MISSES_TOTAL metric - this should never happen")
});

static POOLED_REGISTRY_CLIENTS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "oauth2_client_pooled_registry_clients",
        "Current number of pooled registry clients (one per distinct endpoint)",
    )
    .expect("Failed to create POOLED_REGISTRY_CLIENTS metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(TERMINAL_STATUS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REGISTRY_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REGISTRY_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(LIST_CACHE_HITS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LIST_CACHE_MISSES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(POOLED_REGISTRY_CLIENTS.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_terminal_status(code: &str) {
    TERMINAL_STATUS_TOTAL.with_label_values(&[code]).inc();
}

/// Record one registry request; `outcome` is `ok` or `error`
pub fn record_registry_request(operation: &str, outcome: &str, duration: f64) {
    REGISTRY_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    REGISTRY_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_list_cache_hits() {
    LIST_CACHE_HITS_TOTAL.inc();
}

pub fn increment_list_cache_misses() {
    LIST_CACHE_MISSES_TOTAL.inc();
}

pub fn set_pooled_registry_clients(count: usize) {
    POOLED_REGISTRY_CLIENTS.set(i64::try_from(count).unwrap_or(i64::MAX));
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> Result<String> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
