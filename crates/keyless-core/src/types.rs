//! Core types for the credential broker
//!
//! The request arrives untrusted; identity verification turns it into a
//! [`VerifiedIdentity`], which is the only source the rest of the pipeline
//! reads identity attributes from.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Caller-supplied request body (untrusted)
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialRequest {
    /// Token issued to the CI job for the identity provider's REST API
    pub github_token: String,

    /// Signed identity token; when present its claims override request fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// ARN of the role to assume
    pub role_to_assume: String,

    /// Session name recorded by the cloud provider
    pub role_session_name: String,

    /// Requested credential lifetime; zero leaves it to the role default
    pub duration_seconds: i32,

    /// "owner/repo"
    pub repository: String,

    /// Use the provider's opaque node identifiers as the external id
    pub use_node_id: bool,

    /// "" (raw repository name) or "sha256"
    pub obfuscate_repository: String,

    /// Identity-provider base URL the job was configured against
    pub api_url: String,

    /// Commit the job runs on
    pub sha: String,

    /// Attach session tags to the issued credential
    pub role_session_tagging: bool,

    pub run_id: String,
    pub workflow: String,
    pub actor: String,
    pub branch: String,
}

impl CredentialRequest {
    /// The signed identity token, treating an empty string as absent
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Requested duration, `None` when the role default should apply
    pub fn requested_duration(&self) -> Option<i32> {
        (self.duration_seconds > 0).then_some(self.duration_seconds)
    }

    /// Fields the caller declares about itself, unverified
    pub fn declared_identity(&self) -> DeclaredIdentity {
        DeclaredIdentity {
            repository: self.repository.clone(),
            actor: self.actor.clone(),
            workflow: self.workflow.clone(),
            run_id: self.run_id.clone(),
            sha: self.sha.clone(),
            branch: self.branch.clone(),
        }
    }
}

impl fmt::Debug for CredentialRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRequest")
            .field("github_token", &"<redacted>")
            .field("id_token", &self.id_token().map(|_| "<redacted>"))
            .field("role_to_assume", &self.role_to_assume)
            .field("role_session_name", &self.role_session_name)
            .field("duration_seconds", &self.duration_seconds)
            .field("repository", &self.repository)
            .field("use_node_id", &self.use_node_id)
            .field("obfuscate_repository", &self.obfuscate_repository)
            .field("api_url", &self.api_url)
            .field("sha", &self.sha)
            .field("role_session_tagging", &self.role_session_tagging)
            .field("run_id", &self.run_id)
            .field("workflow", &self.workflow)
            .field("actor", &self.actor)
            .field("branch", &self.branch)
            .finish()
    }
}

/// Claims of a verified CI identity token
///
/// Only populated after signature, algorithm and issuer checks pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdTokenClaims {
    #[serde(rename = "iss")]
    pub issuer: String,

    /// `kind:repository:ref-descriptor`
    #[serde(rename = "sub")]
    pub subject: String,

    /// Audience (string or array in the token)
    #[serde(rename = "aud", deserialize_with = "one_or_many")]
    pub audience: Vec<String>,

    /// Expiration (seconds since epoch)
    #[serde(rename = "exp", skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,

    pub repository: String,
    pub repository_owner: String,
    pub repository_id: String,
    pub actor: String,
    pub actor_id: String,
    pub workflow: String,
    pub run_id: String,
    pub run_attempt: String,
    pub sha: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub environment: String,
    pub event_name: String,
    pub job_workflow_ref: String,
}

impl IdTokenClaims {
    /// Audience values joined into a single attribute string
    pub fn audience_value(&self) -> String {
        self.audience.join(",")
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(aud)) => vec![aud],
        Some(OneOrMany::Many(auds)) => auds,
        None => Vec::new(),
    })
}

/// Self-declared identity fields accompanying a verified automation token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredIdentity {
    pub repository: String,
    pub actor: String,
    pub workflow: String,
    pub run_id: String,
    pub sha: String,
    pub branch: String,
}

/// Trusted outcome of identity verification
///
/// Constructed once per request and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifiedIdentity {
    /// Claims from a signed identity token (cryptographically bound)
    IdToken(IdTokenClaims),

    /// The REST token was proven to be a machine-generated automation token
    /// with write access to the declared repository
    AutomationToken(DeclaredIdentity),
}

impl VerifiedIdentity {
    /// Repository full name, preferring signed claims
    pub fn repository(&self) -> &str {
        match self {
            VerifiedIdentity::IdToken(claims) => &claims.repository,
            VerifiedIdentity::AutomationToken(declared) => &declared.repository,
        }
    }

    /// Actor login, preferring signed claims
    pub fn actor(&self) -> &str {
        match self {
            VerifiedIdentity::IdToken(claims) => &claims.actor,
            VerifiedIdentity::AutomationToken(declared) => &declared.actor,
        }
    }

    /// Signed claims, if the identity came from an identity token
    pub fn claims(&self) -> Option<&IdTokenClaims> {
        match self {
            VerifiedIdentity::IdToken(claims) => Some(claims),
            VerifiedIdentity::AutomationToken(_) => None,
        }
    }
}

/// Which encoding of opaque node identifiers to request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdFormat {
    /// Always the next format
    Next,
    /// Legacy or next, depending on when the entity was created
    Legacy,
}

impl fmt::Display for IdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdFormat::Next => write!(f, "next"),
            IdFormat::Legacy => write!(f, "legacy"),
        }
    }
}

/// Short-lived credential returned to the caller
///
/// Only produced by a fully successful exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialResult {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CredentialResult {
    /// Append a human-readable warning
    pub fn push_warning(&mut self, warning: &str) {
        match &mut self.warning {
            Some(existing) => existing.push_str(warning),
            None => self.warning = Some(warning.to_string()),
        }
    }
}

impl fmt::Debug for CredentialResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResult")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("warning", &self.warning)
            .finish()
    }
}

/// Error body returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
