//! # Observability
//!
//! Prometheus metrics collection, exposed by the HTTP server in
//! `controller::server`.

pub mod metrics;

pub use metrics::*;
