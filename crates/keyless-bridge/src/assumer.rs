//! Role-assumption capability

use async_trait::async_trait;

use crate::types::{AssumeRoleFailure, AssumeRoleParams, IssuedCredentials};

/// Exchanges a role ARN (plus external id and tags) for session credentials
///
/// Each call is attempted exactly once; implementations must not retry.
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume_role(
        &self,
        params: &AssumeRoleParams,
    ) -> std::result::Result<IssuedCredentials, AssumeRoleFailure>;

    /// Get a description of this assumer (for logging)
    fn description(&self) -> &str {
        "role assumer"
    }
}
