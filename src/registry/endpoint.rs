//! # Endpoint Resolution
//!
//! Merges a resource's `adminEndpoint` override with the controller defaults and
//! validates the result into an [`EndpointKey`].

use crate::constants::FORWARDED_PROTO_OFF;
use crate::crd::{AdminEndpoint, ApiKeySecretRef};
use reqwest::Url;
use thiserror::Error;

/// Controller-wide endpoint defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDefaults {
    pub url: Option<String>,
    pub port: u16,
    pub endpoint: String,
    pub forwarded_proto: Option<String>,
}

/// Identifies one distinct registry deployment/configuration
///
/// Resources resolving to the same key share one pooled client and one list cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    pub url: String,
    pub port: u16,
    pub endpoint: String,
    /// Header value; `None` when unset or `off`
    pub forwarded_proto: Option<String>,
}

impl EndpointKey {
    /// Collection URL: scheme and host of `url`, the port, and the sub-path
    pub fn base_url(&self) -> Result<Url, EndpointError> {
        let mut base = Url::parse(&self.url).map_err(|e| EndpointError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        base.set_port(Some(self.port))
            .map_err(|()| EndpointError::InvalidUrl {
                url: self.url.clone(),
                reason: "URL cannot carry a port".to_string(),
            })?;
        base.set_path(&self.endpoint);
        base.set_query(None);
        base.set_fragment(None);
        Ok(base)
    }
}

impl std::fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}{}", self.url, self.port, self.endpoint)
    }
}

/// Endpoint configuration plus the optional API key reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub key: EndpointKey,
    /// Namespace always filled in
    pub api_key_ref: Option<ApiKeySecretRef>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("no registry URL configured: set --registry-url or spec.adminEndpoint.url")]
    MissingUrl,
    #[error("registry address {url} is invalid: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("registry endpoint {0} must be empty or start with '/'")]
    InvalidPath(String),
    #[error("forwarded proto {0} must be one of http, https, off")]
    InvalidForwardedProto(String),
}

impl EndpointError {
    /// Operator misconfiguration rather than a bad per-resource override
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingUrl)
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Resolve the effective endpoint for a resource in `namespace`
pub fn resolve_endpoint(
    defaults: &EndpointDefaults,
    override_: Option<&AdminEndpoint>,
    namespace: &str,
) -> Result<ResolvedEndpoint, EndpointError> {
    let empty = AdminEndpoint::default();
    let o = override_.unwrap_or(&empty);

    let url = non_empty(o.url.as_ref())
        .or(non_empty(defaults.url.as_ref()))
        .ok_or(EndpointError::MissingUrl)?
        .trim_end_matches('/')
        .to_string();
    let port = o.port.filter(|p| *p != 0).unwrap_or(defaults.port);
    let endpoint = non_empty(o.endpoint.as_ref())
        .unwrap_or(&defaults.endpoint)
        .to_string();
    let forwarded_proto = non_empty(o.forwarded_proto.as_ref())
        .or(non_empty(defaults.forwarded_proto.as_ref()))
        .map(str::to_string);

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(EndpointError::InvalidUrl {
            url,
            reason: "scheme must be http or https".to_string(),
        });
    }
    if !endpoint.is_empty() && !endpoint.starts_with('/') {
        return Err(EndpointError::InvalidPath(endpoint));
    }
    let forwarded_proto = match forwarded_proto.as_deref() {
        None | Some(FORWARDED_PROTO_OFF) => None,
        Some("http" | "https") => forwarded_proto,
        Some(other) => return Err(EndpointError::InvalidForwardedProto(other.to_string())),
    };

    let key = EndpointKey {
        url,
        port,
        endpoint,
        forwarded_proto,
    };
    key.base_url()?;

    let api_key_ref = o.api_key_secret_ref.as_ref().map(|r| ApiKeySecretRef {
        name: r.name.clone(),
        namespace: Some(
            r.namespace
                .clone()
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| namespace.to_string()),
        ),
        key: r.key.clone(),
    });

    Ok(ResolvedEndpoint { key, api_key_ref })
}
