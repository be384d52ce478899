//! GitHub REST client
//!
//! A deliberately small client: create-commit-status and the two node-id
//! lookups, plus identity-token verification delegated to
//! [`IdTokenVerifier`]. Path segments are percent-encoded, and owner,
//! repository and commit are validated before anything is sent.

use async_trait::async_trait;
use keyless_core::{ApiBaseUrl, IdFormat, IdTokenClaims};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::oidc::IdTokenVerifier;
use crate::error::{BridgeError, Result};
use crate::provider::IdentityProvider;
use crate::types::{CreateStatusRequest, CreateStatusResponse, NodeResponse};

/// User agent sent with every outbound request
pub const USER_AGENT: &str = concat!("keyless-broker/", env!("CARGO_PKG_VERSION"));

const GITHUB_V3_JSON: &str = "application/vnd.github.v3+json";

/// Header selecting the node id encoding during the global id migration
const NEXT_GLOBAL_ID_HEADER: &str = "X-Github-Next-Global-ID";

/// Build the shared outbound HTTP client
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(BridgeError::from)
}

/// GitHub REST + OIDC client bound to one API deployment
#[derive(Clone)]
pub struct GitHubClient {
    base_url: ApiBaseUrl,
    http: reqwest::Client,
    oidc: IdTokenVerifier,
}

impl GitHubClient {
    /// Create a client for `base_url`
    ///
    /// # Arguments
    /// * `http` - shared outbound client (see [`http_client`])
    /// * `base_url` - canonical API base URL, fixed for the process lifetime
    /// * `oidc` - verifier for the deployment's identity tokens
    pub fn new(http: reqwest::Client, base_url: ApiBaseUrl, oidc: IdTokenVerifier) -> Self {
        Self {
            base_url,
            http,
            oidc,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        self.base_url
            .join_segments(segments)
            .map_err(|e| BridgeError::InvalidParameter(e.message().to_string()))
    }

    async fn get_node(
        &self,
        format: IdFormat,
        token: &str,
        segments: &[&str],
    ) -> Result<NodeResponse> {
        let url = self.url(segments)?;
        debug!(url = %url, format = %format, "Fetching node id");

        let response = self
            .http
            .get(url)
            .header(ACCEPT, GITHUB_V3_JSON)
            .header(AUTHORIZATION, format!("token {}", token))
            .header(NEXT_GLOBAL_ID_HEADER, next_global_id_value(format))
            .send()
            .await?;

        decode_expected(response, StatusCode::OK).await
    }
}

#[async_trait]
impl IdentityProvider for GitHubClient {
    async fn create_status(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        git_ref: &str,
        status: &CreateStatusRequest,
    ) -> Result<CreateStatusResponse> {
        validate_owner_name(owner)?;
        validate_repo_name(repo)?;
        validate_ref(git_ref)?;

        let url = self.url(&["repos", owner, repo, "statuses", git_ref])?;
        debug!(url = %url, "Creating commit status");

        let response = self
            .http
            .post(url)
            .header(ACCEPT, GITHUB_V3_JSON)
            .header(AUTHORIZATION, format!("token {}", token))
            .json(status)
            .send()
            .await?;

        decode_expected(response, StatusCode::CREATED).await
    }

    async fn get_repo(
        &self,
        format: IdFormat,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<NodeResponse> {
        validate_owner_name(owner)?;
        validate_repo_name(repo)?;
        self.get_node(format, token, &["repos", owner, repo]).await
    }

    async fn get_user(&self, format: IdFormat, token: &str, user: &str) -> Result<NodeResponse> {
        // bot logins such as "dependabot[bot]" are valid here, so only emptiness is checked
        if user.is_empty() {
            return Err(BridgeError::InvalidParameter("user name is empty".into()));
        }
        self.get_node(format, token, &["users", user]).await
    }

    async fn parse_id_token(&self, id_token: &str) -> Result<IdTokenClaims> {
        self.oidc.verify(id_token).await
    }

    fn validate_api_url(&self, api_url: &str) -> Result<()> {
        self.base_url
            .verify(api_url)
            .map_err(|e| BridgeError::UnsupportedApiUrl(e.message().to_string()))
    }

    fn description(&self) -> &str {
        "GitHub REST client"
    }
}

fn next_global_id_value(format: IdFormat) -> &'static str {
    match format {
        // force the next format for every id field
        IdFormat::Next => "1",
        // legacy or next, depending on when the entity was created
        IdFormat::Legacy => "0",
    }
}

async fn decode_expected<T: DeserializeOwned>(
    response: reqwest::Response,
    expected: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected {
        return Err(BridgeError::UnexpectedStatus {
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Owner (user or organization) names: ASCII alphanumerics and `-`
pub fn validate_owner_name(owner: &str) -> Result<()> {
    let valid = !owner.is_empty()
        && owner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(BridgeError::InvalidParameter(format!(
            "invalid owner name: {:?}",
            owner
        )))
    }
}

/// Repository names: ASCII alphanumerics and `-_.`, never `.` or `..`
pub fn validate_repo_name(repo: &str) -> Result<()> {
    let valid = !repo.is_empty()
        && repo != "."
        && repo != ".."
        && repo
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(BridgeError::InvalidParameter(format!(
            "invalid repository name: {:?}",
            repo
        )))
    }
}

/// Commit refs: non-empty, no whitespace or control characters, no `..`
pub fn validate_ref(git_ref: &str) -> Result<()> {
    let valid = !git_ref.is_empty()
        && !git_ref.contains("..")
        && !git_ref
            .chars()
            .any(|c| c.is_whitespace() || c.is_control());
    if valid {
        Ok(())
    } else {
        Err(BridgeError::InvalidParameter(format!(
            "invalid ref: {:?}",
            git_ref
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_names() {
        assert!(validate_owner_name("fuller-inc").is_ok());
        assert!(validate_owner_name("Octocat42").is_ok());

        for bad in ["", "octo/cat", "octo cat", "octo_cat", "..", "オクト"] {
            let err = validate_owner_name(bad).unwrap_err();
            assert!(err.is_caller_caused(), "{bad:?} must be rejected");
        }
    }

    #[test]
    fn test_repo_names() {
        assert!(validate_repo_name("actions-aws-assume-role").is_ok());
        assert!(validate_repo_name(".github").is_ok());
        assert!(validate_repo_name("repo_v1.2").is_ok());

        for bad in ["", ".", "..", "a/b", "a b", "a%2fb"] {
            assert!(validate_repo_name(bad).is_err(), "{bad:?} must be rejected");
        }
    }

    #[test]
    fn test_refs() {
        assert!(validate_ref("e3a45c6c16c1464826b36a598ff39e6cc98c4da4").is_ok());
        assert!(validate_ref("refs/heads/main").is_ok());

        for bad in ["", "main..evil", "with space", "tab\there", "nl\n"] {
            assert!(validate_ref(bad).is_err(), "{bad:?} must be rejected");
        }
    }

    #[test]
    fn test_next_global_id_header_values() {
        assert_eq!(next_global_id_value(IdFormat::Next), "1");
        assert_eq!(next_global_id_value(IdFormat::Legacy), "0");
    }
}
