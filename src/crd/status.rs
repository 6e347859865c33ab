//! # OAuth2Client Status
//!
//! Status types for tracking reconciliation state and conditions.

use serde::{Deserialize, Serialize};

/// Status of the OAuth2Client resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2ClientStatus {
    /// Generation of the spec last reconciled, successfully or with a terminal error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Terminal error from the last reconciliation, absent when the client is in sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation_error: Option<ReconciliationError>,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Terminal reconciliation error recorded on the resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationError {
    pub status_code: StatusCode,
    pub description: String,
}

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    #[serde(rename = "CLIENT_REGISTRATION_FAILED")]
    RegistrationFailed,
    #[serde(rename = "SECRET_CREATION_FAILED")]
    SecretCreationFailed,
    #[serde(rename = "CLIENT_UPDATE_FAILED")]
    UpdateFailed,
    InvalidSecret,
    InvalidEndpointAddress,
}

impl StatusCode {
    /// Wire value, also used as the condition reason and metric label
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegistrationFailed => "CLIENT_REGISTRATION_FAILED",
            Self::SecretCreationFailed => "SECRET_CREATION_FAILED",
            Self::UpdateFailed => "CLIENT_UPDATE_FAILED",
            Self::InvalidSecret => "INVALID_SECRET",
            Self::InvalidEndpointAddress => "INVALID_ENDPOINT_ADDRESS",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition status values
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}
