//! # Admin Endpoint Override
//!
//! Per-resource registry admin endpoint configuration.

use serde::{Deserialize, Serialize};

/// Registry admin endpoint override
///
/// Every field is optional; empty fields inherit the controller-wide defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminEndpoint {
    /// Base URL of the admin API (must start with `http://` or `https://`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Admin API port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Clients sub-path (must start with `/`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Value of the `X-Forwarded-Proto` header (`http`, `https`, or `off` to disable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_proto: Option<String>,
    /// Secret holding a bearer token for the admin API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_secret_ref: Option<ApiKeySecretRef>,
}

/// Reference to a key inside a Secret
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySecretRef {
    pub name: String,
    /// Defaults to the namespace of the `OAuth2Client`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub key: String,
}
