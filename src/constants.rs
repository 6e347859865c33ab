//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Field manager / controller name used for patches and logging
pub const CONTROLLER_NAME: &str = "oauth2-client-controller";

/// Finalizer marker guarding registry cleanup before an `OAuth2Client` is removed
pub const FINALIZER_NAME: &str = "oauth2.octopilot.io/finalizer";

/// Default key of the client identifier inside the credential secret
pub const DEFAULT_CLIENT_ID_KEY: &str = "client_id";

/// Default key of the client secret inside the credential secret
pub const DEFAULT_CLIENT_SECRET_KEY: &str = "client_secret";

/// Default registry admin port
pub const DEFAULT_REGISTRY_PORT: u16 = 4445;

/// Default registry clients endpoint (sub-path appended to the base URL)
pub const DEFAULT_REGISTRY_ENDPOINT: &str = "/clients";

/// Forwarded-proto value that disables the `X-Forwarded-Proto` header
pub const FORWARDED_PROTO_OFF: &str = "off";

/// Environment variable that overrides the bearer token for every registry endpoint
pub const REGISTRY_API_KEY_ENV: &str = "REGISTRY_API_KEY";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default list cache time-to-live (seconds)
pub const DEFAULT_LIST_CACHE_TTL_SECS: u64 = 5;

/// Default per-request timeout for registry calls (seconds)
pub const DEFAULT_REGISTRY_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default resync period for successfully reconciled resources (seconds, 10h)
pub const DEFAULT_SYNC_PERIOD_SECS: u64 = 36_000;

/// Default minimum error backoff (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default maximum error backoff (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

