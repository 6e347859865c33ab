//! # Registry
//!
//! Everything that talks to the OAuth2 client registry admin API.
//!
//! - `types.rs` - Wire record and credentials
//! - `mapping.rs` - `OAuth2Client` to wire record conversion and validation
//! - `endpoint.rs` - Endpoint defaults merge and validation
//! - `client.rs` - `RegistryClient` trait and `RegistryError`
//! - `http.rs` - reqwest implementation
//! - `cache.rs` - List cache decorator, invalidated on every mutation
//! - `pool.rs` - Per-endpoint client pool and factory

pub mod cache;
pub mod client;
pub mod endpoint;
pub mod http;
pub mod mapping;
pub mod pool;
pub mod types;

pub use cache::CachingRegistryClient;
pub use client::{RegistryClient, RegistryError};
pub use endpoint::{resolve_endpoint, EndpointDefaults, EndpointError, EndpointKey, ResolvedEndpoint};
pub use http::{HttpOptions, HttpRegistryClient};
pub use mapping::{merge_scope, owner_of, to_record, with_credentials, MappingError};
pub use pool::{ClientPool, HttpClientFactory, RegistryClientFactory};
pub use types::{Credentials, OAuth2ClientRecord, RecordLifespans};
