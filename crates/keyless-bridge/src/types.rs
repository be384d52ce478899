//! Wire types exchanged with the identity provider and the role-assumption API

use keyless_core::SessionTagSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Login of the CI automation identity
pub const BOT_LOGIN: &str = "github-actions[bot]";

/// Numeric id of the CI automation identity
pub const BOT_ID: i64 = 41898282;

/// Principal type of the CI automation identity
pub const BOT_TYPE: &str = "Bot";

/// State of a commit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Error,
    Failure,
    Pending,
    Success,
}

/// Body of a create-commit-status call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStatusRequest {
    pub state: CommitState,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

/// The principal that created a commit status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCreator {
    pub login: String,
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl StatusCreator {
    /// Whether this is exactly the CI automation identity
    pub fn is_automation_bot(&self) -> bool {
        self.login == BOT_LOGIN && self.id == BOT_ID && self.kind == BOT_TYPE
    }
}

/// Fields of a created commit status the broker looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStatusResponse {
    pub creator: Option<StatusCreator>,
}

/// Repository or user lookup result; only the opaque node id is used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub node_id: String,
}

/// One role-assumption call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleParams {
    pub role_arn: String,
    pub session_name: String,

    /// `None` lets the role's default duration apply
    pub duration_seconds: Option<i32>,

    /// `None` on the trust-policy probe
    pub external_id: Option<String>,

    pub tags: SessionTagSet,
}

/// Credentials returned by a successful role assumption
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl fmt::Debug for IssuedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Why a role assumption failed
///
/// Access denial is the only outcome the exchange engine distinguishes; every
/// other failure is treated as infrastructure trouble.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssumeRoleFailure {
    #[error("AccessDenied: {message}")]
    AccessDenied { message: String },

    #[error("{0}")]
    Other(String),
}

impl AssumeRoleFailure {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, AssumeRoleFailure::AccessDenied { .. })
    }
}
