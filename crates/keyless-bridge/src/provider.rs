//! Identity-provider capability

use async_trait::async_trait;
use keyless_core::{IdFormat, IdTokenClaims};

use crate::error::Result;
use crate::types::{CreateStatusRequest, CreateStatusResponse, NodeResponse};

/// Everything the broker needs from the identity provider
///
/// Implementations are shared across concurrent requests and hold no
/// per-request state.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a commit status on `owner/repo` at `git_ref`
    ///
    /// Used as a harmless write to prove the token can write to the
    /// repository and to learn which principal it belongs to.
    async fn create_status(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        git_ref: &str,
        status: &CreateStatusRequest,
    ) -> Result<CreateStatusResponse>;

    /// Look up a repository's opaque node id in the given format
    async fn get_repo(
        &self,
        format: IdFormat,
        token: &str,
        owner: &str,
        repo: &str,
    ) -> Result<NodeResponse>;

    /// Look up a user's opaque node id in the given format
    async fn get_user(&self, format: IdFormat, token: &str, user: &str) -> Result<NodeResponse>;

    /// Verify a signed identity token and decode its claims
    async fn parse_id_token(&self, id_token: &str) -> Result<IdTokenClaims>;

    /// Check the caller-reported API URL against the configured deployment
    fn validate_api_url(&self, api_url: &str) -> Result<()>;

    /// Get a description of this provider (for logging)
    fn description(&self) -> &str {
        "identity provider"
    }
}
