//! OAuth2 Client Controller Library
//!
//! Keeps `OAuth2Client` custom resources in sync with an OAuth2 client registry
//! admin API. Unit tests live next to the code; engine and wire tests are in `tests/`.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod registry;
pub mod runtime;
