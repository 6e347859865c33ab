//! # Configuration
//!
//! Controller configuration from environment variables and command-line flags.

pub mod controller;
pub mod duration;

pub use controller::{split_namespaces, ControllerConfig, LogFormat};
pub use duration::parse_duration;
