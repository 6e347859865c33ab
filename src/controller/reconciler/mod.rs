//! # Reconciler
//!
//! Core reconciliation logic for `OAuth2Client` resources.
//!
//! The reconciler:
//! - Watches `OAuth2Client` resources across all namespaces (optionally filtered)
//! - Guards registry cleanup with a finalizer
//! - Registers, updates and unregisters clients in the registry admin API
//! - Creates credential Secrets for clients registered without one
//! - Updates resource status with reconciliation results
//!
//! ## Reconciliation Flow
//!
//! 1. Load the resource and attach the finalizer
//! 2. On deletion: unregister owned records (unless `deletionPolicy: orphan`)
//! 3. Read the credential Secret, or register and create it
//! 4. Create or update the registry record
//! 5. Update status

pub mod credentials;
pub mod finalize;
mod reconcile;
pub mod status;
pub mod store;
pub mod types;

// Re-export public API
pub use reconcile::{reconcile, reconcile_key};
pub use store::{ClusterStore, KubeStore, StoreError};
pub use types::{
    BackoffState, Lifecycle, Reconciler, ReconcilerConfig, ReconcilerError, ResourceKey,
    SecretKeys,
};
