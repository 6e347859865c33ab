//! # Credentials
//!
//! Reading client credentials from the credential Secret and building the
//! Secret that stores freshly generated credentials.

use crate::controller::reconciler::types::SecretKeys;
use crate::crd::{OAuth2Client, TokenEndpointAuthMethod};
use crate::registry::{Credentials, OAuth2ClientRecord};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("{0} property missing")]
    MissingKey(String),
    #[error("registry response carried no client_id")]
    MissingClientId,
}

/// Extract credentials; the client secret may be absent only for public clients
pub fn parse_secret(
    secret: &Secret,
    keys: &SecretKeys,
    auth_method: Option<TokenEndpointAuthMethod>,
) -> Result<Credentials, CredentialsError> {
    let data = secret.data.as_ref();
    let id = data
        .and_then(|d| d.get(&keys.client_id))
        .ok_or_else(|| CredentialsError::MissingKey(keys.client_id.clone()))?;
    let client_secret = data.and_then(|d| d.get(&keys.client_secret));

    if client_secret.is_none() && auth_method != Some(TokenEndpointAuthMethod::None) {
        return Err(CredentialsError::MissingKey(keys.client_secret.clone()));
    }

    Ok(Credentials {
        id: id.0.clone(),
        secret: client_secret.map(|s| s.0.clone()),
    })
}

/// Secret holding the credentials the registry generated for `client`
///
/// Owned by `client` so it is garbage collected with it.
pub fn credentials_secret(
    client: &OAuth2Client,
    keys: &SecretKeys,
    created: &OAuth2ClientRecord,
) -> Result<Secret, CredentialsError> {
    let id = created
        .client_id
        .as_ref()
        .filter(|id| !id.is_empty())
        .ok_or(CredentialsError::MissingClientId)?;

    let mut data = BTreeMap::new();
    data.insert(keys.client_id.clone(), ByteString(id.as_bytes().to_vec()));
    if let Some(secret) = &created.client_secret {
        data.insert(
            keys.client_secret.clone(),
            ByteString(secret.as_bytes().to_vec()),
        );
    }

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(client.spec.secret_name.clone()),
            namespace: client.namespace(),
            owner_references: client.controller_owner_ref(&()).map(|r| vec![r]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    })
}
