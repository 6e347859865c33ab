//! # Wire Mapper
//!
//! Converts an `OAuth2Client` into the registry wire record and validates the
//! result. Pure: no I/O, no logging beyond a deprecation notice.

use crate::crd::{OAuth2Client, TokenEndpointAuthMethod, TokenLifespans};
use crate::registry::types::{Credentials, OAuth2ClientRecord, RecordLifespans};
use kube::ResourceExt;
use thiserror::Error;
use tracing::debug;

/// Mapping validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("jwksUri is required when tokenEndpointAuthMethod is private_key_jwt")]
    MissingJwksUri,
}

/// Owner tag embedded into every record: `namespace/name`
pub fn owner_of(resource: &OAuth2Client) -> String {
    format!(
        "{}/{}",
        resource.namespace().unwrap_or_default(),
        resource.name_any()
    )
}

/// Merge the scope list and the legacy scope string
///
/// List entries come first and the legacy string is appended last. Tokens are
/// joined by single spaces; blank entries contribute nothing.
pub fn merge_scope(scope_array: &[String], legacy: &str) -> String {
    scope_array
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(legacy))
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the registry record for `resource`, without credentials
pub fn to_record(resource: &OAuth2Client) -> Result<OAuth2ClientRecord, MappingError> {
    let spec = &resource.spec;

    if !spec.scope.is_empty() {
        debug!(
            resource.name = %resource.name_any(),
            "Field `scope` is deprecated, use `scopeArray`"
        );
    }

    if spec.token_endpoint_auth_method == Some(TokenEndpointAuthMethod::PrivateKeyJwt)
        && spec.jwks_uri.trim().is_empty()
    {
        return Err(MappingError::MissingJwksUri);
    }

    Ok(OAuth2ClientRecord {
        client_id: None,
        client_secret: None,
        client_name: spec.client_name.clone(),
        grant_types: spec.grant_types.iter().map(|g| g.as_str().to_string()).collect(),
        response_types: spec
            .response_types
            .iter()
            .map(|r| r.as_str().to_string())
            .collect(),
        redirect_uris: spec.redirect_uris.clone(),
        post_logout_redirect_uris: spec.post_logout_redirect_uris.clone(),
        allowed_cors_origins: spec.allowed_cors_origins.clone(),
        audience: spec.audience.clone(),
        scope: merge_scope(&spec.scope_array, &spec.scope),
        skip_consent: spec.skip_consent,
        owner: owner_of(resource),
        token_endpoint_auth_method: spec
            .token_endpoint_auth_method
            .map(|m| m.as_str().to_string()),
        metadata: spec.metadata.clone(),
        jwks_uri: spec.jwks_uri.clone(),
        frontchannel_logout_session_required: spec.front_channel_logout_session_required,
        frontchannel_logout_uri: spec.front_channel_logout_uri.clone(),
        backchannel_logout_session_required: spec.back_channel_logout_session_required,
        backchannel_logout_uri: spec.back_channel_logout_uri.clone(),
        client_secret_expires_at: None,
        lifespans: lifespans(&spec.token_lifespans),
    })
}

/// Attach credentials to a record; the secret is only set when present
pub fn with_credentials(mut record: OAuth2ClientRecord, credentials: &Credentials) -> OAuth2ClientRecord {
    record.client_id = Some(credentials.id_str());
    if let Some(secret) = &credentials.secret {
        record.client_secret = Some(String::from_utf8_lossy(secret).into_owned());
    }
    record
}

fn lifespans(l: &TokenLifespans) -> RecordLifespans {
    RecordLifespans {
        authorization_code_grant_access_token_lifespan: l
            .authorization_code_grant_access_token_lifespan
            .clone(),
        authorization_code_grant_id_token_lifespan: l.authorization_code_grant_id_token_lifespan.clone(),
        authorization_code_grant_refresh_token_lifespan: l
            .authorization_code_grant_refresh_token_lifespan
            .clone(),
        client_credentials_grant_access_token_lifespan: l
            .client_credentials_grant_access_token_lifespan
            .clone(),
        implicit_grant_access_token_lifespan: l.implicit_grant_access_token_lifespan.clone(),
        implicit_grant_id_token_lifespan: l.implicit_grant_id_token_lifespan.clone(),
        jwt_bearer_grant_access_token_lifespan: l.jwt_bearer_grant_access_token_lifespan.clone(),
        refresh_token_grant_access_token_lifespan: l.refresh_token_grant_access_token_lifespan.clone(),
        refresh_token_grant_id_token_lifespan: l.refresh_token_grant_id_token_lifespan.clone(),
        refresh_token_grant_refresh_token_lifespan: l
            .refresh_token_grant_refresh_token_lifespan
            .clone(),
    }
}
