//! # Custom Resource Definitions
//!
//! CRD types for the OAuth2 Client Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `OAuth2Client` specification and its enums
//! - `endpoint.rs` - Per-resource registry endpoint override
//! - `status.rs` - Status types for tracking reconciliation state

mod endpoint;
mod spec;
mod status;

pub use endpoint::{AdminEndpoint, ApiKeySecretRef};
pub use spec::{
    DeletionPolicy, GrantType, OAuth2Client, OAuth2ClientSpec, ResponseType,
    TokenEndpointAuthMethod, TokenLifespans,
};
pub use status::{
    Condition, ConditionStatus, OAuth2ClientStatus, ReconciliationError, StatusCode,
};
