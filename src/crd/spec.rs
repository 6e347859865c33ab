//! # OAuth2Client Spec
//!
//! Main CRD specification types and the enums projected onto the registry wire format.

use serde::{Deserialize, Serialize};

/// OAuth2Client Custom Resource Definition
///
/// Declares an OAuth2 client that the controller keeps registered in the
/// client registry admin API.
///
/// # Example
///
/// ```yaml
/// apiVersion: oauth2.octopilot.io/v1alpha1
/// kind: OAuth2Client
/// metadata:
///   name: my-app
///   namespace: default
/// spec:
///   grantTypes: [client_credentials]
///   scopeArray: [read, write]
///   secretName: my-app-oauth2
///   adminEndpoint:
///     url: http://registry-admin.auth.svc
///     port: 4445
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema, PartialEq)]
#[kube(
    kind = "OAuth2Client",
    group = "oauth2.octopilot.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::OAuth2ClientStatus",
    shortname = "oac",
    printcolumn = r#"{"name":"Secret", "type":"string", "jsonPath":".spec.secretName"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Error", "type":"string", "jsonPath":".status.reconciliationError.statusCode"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2ClientSpec {
    /// Human-readable client name
    #[serde(default)]
    pub client_name: String,
    /// OAuth 2.0 grant types the client may use
    pub grant_types: Vec<GrantType>,
    /// OAuth 2.0 response types the client may use at the authorization endpoint
    #[serde(default)]
    pub response_types: Vec<ResponseType>,
    /// Allowed redirect URIs
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    /// Allowed URIs to redirect to after logout
    #[serde(default)]
    pub post_logout_redirect_uris: Vec<String>,
    /// Origins allowed to make CORS requests with this client
    #[serde(default)]
    pub allowed_cors_origins: Vec<String>,
    /// Audiences the client is allowed to request
    #[serde(default)]
    pub audience: Vec<String>,
    /// Space-separated scope string
    /// Deprecated in favour of `scopeArray`; when both are set the string is appended last
    #[serde(default)]
    pub scope: String,
    /// Scopes the client is allowed to request
    #[serde(default)]
    pub scope_array: Vec<String>,
    /// Name of the Secret holding the client credentials
    /// Created by the controller after the first registration when absent
    pub secret_name: String,
    /// Registry admin endpoint override
    /// Unset fields inherit the controller defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_endpoint: Option<crate::crd::AdminEndpoint>,
    /// Client authentication method at the token endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method: Option<TokenEndpointAuthMethod>,
    /// Arbitrary metadata stored with the registry record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_object")]
    pub metadata: Option<serde_json::Value>,
    /// URL of the client's JSON Web Key Set
    /// Required when `tokenEndpointAuthMethod` is `private_key_jwt`
    #[serde(default)]
    pub jwks_uri: String,
    /// Skip the consent screen for this client
    #[serde(default)]
    pub skip_consent: bool,
    /// Front-channel logout URI
    #[serde(default)]
    pub front_channel_logout_uri: String,
    /// Whether the issuer and session id are sent with front-channel logout
    #[serde(default)]
    pub front_channel_logout_session_required: bool,
    /// Back-channel logout URI
    #[serde(default)]
    pub back_channel_logout_uri: String,
    /// Whether a session id is included in the back-channel logout token
    #[serde(default)]
    pub back_channel_logout_session_required: bool,
    /// Per-grant token lifespans (duration strings such as "1h" or "30m")
    #[serde(default)]
    pub token_lifespans: TokenLifespans,
    /// What happens to the registry record when this resource is deleted
    /// Default: delete
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

/// OAuth 2.0 grant type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum GrantType {
    #[serde(rename = "client_credentials")]
    ClientCredentials,
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    #[serde(rename = "implicit")]
    Implicit,
    #[serde(rename = "refresh_token")]
    RefreshToken,
    #[serde(rename = "urn:ietf:params:oauth:grant-type:jwt-bearer")]
    JwtBearer,
}

impl GrantType {
    /// Wire value as stored in the registry
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::AuthorizationCode => "authorization_code",
            Self::Implicit => "implicit",
            Self::RefreshToken => "refresh_token",
            Self::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
        }
    }
}

/// OAuth 2.0 response type, including the OpenID Connect combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ResponseType {
    #[serde(rename = "code")]
    Code,
    #[serde(rename = "id_token")]
    IdToken,
    #[serde(rename = "token")]
    Token,
    #[serde(rename = "code token")]
    CodeToken,
    #[serde(rename = "code id_token")]
    CodeIdToken,
    #[serde(rename = "id_token token")]
    IdTokenToken,
    #[serde(rename = "code id_token token")]
    CodeIdTokenToken,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::IdToken => "id_token",
            Self::Token => "token",
            Self::CodeToken => "code token",
            Self::CodeIdToken => "code id_token",
            Self::IdTokenToken => "id_token token",
            Self::CodeIdTokenToken => "code id_token token",
        }
    }
}

/// Client authentication method at the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    ClientSecretBasic,
    ClientSecretPost,
    PrivateKeyJwt,
    None,
}

impl TokenEndpointAuthMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
            Self::PrivateKeyJwt => "private_key_jwt",
            Self::None => "none",
        }
    }
}

/// Registry record handling on resource deletion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeletionPolicy {
    /// Delete owned records from the registry
    #[default]
    Delete,
    /// Leave owned records in the registry
    Orphan,
}

/// Token lifespans per grant, passed through to the registry unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenLifespans {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code_grant_access_token_lifespan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code_grant_id_token_lifespan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code_grant_refresh_token_lifespan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_credentials_grant_access_token_lifespan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_grant_access_token_lifespan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_grant_id_token_lifespan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_bearer_grant_access_token_lifespan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_grant_access_token_lifespan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_grant_id_token_lifespan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_grant_refresh_token_lifespan: Option<String>,
}

/// Free-form object schema for `metadata`
fn preserve_unknown_object(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}
