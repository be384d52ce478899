//! Identity verification
//!
//! Proves the caller is who it claims to be, via exactly one of two paths:
//!
//! 1. **Signed token**: the identity token's signature, algorithm and issuer
//!    are verified; its claims become the identity.
//! 2. **Token probe**: the REST token's kind is checked offline, then a
//!    harmless commit status is written to the declared repository. The
//!    write must succeed and must be attributed to the automation bot.

use keyless_bridge::{CommitState, CreateStatusRequest, IdentityProvider};
use keyless_core::{
    check_token_kind, BrokerError, CredentialRequest, RepositoryName, Result, VerifiedIdentity,
};
use tracing::{debug, warn};

/// Context label of the probe commit status
pub const COMMIT_STATUS_CONTEXT: &str = "aws-assume-role";

/// Description of the probe commit status
pub const COMMIT_STATUS_DESCRIPTION: &str = "valid github token";

const INSUFFICIENT_PERMISSION: &str =
    "Your GITHUB_TOKEN doesn't have enough permission. Write-Permission is required.";

const NOT_AUTOMATION_BOT: &str = "`github-token` isn't generated by @github-actions[bot]. \
     `github-token` must be `${{ github.token }}` or `${{ secrets.GITHUB_TOKEN }}`.";

/// Which verification the request takes
enum VerificationPath<'a> {
    SignedToken(&'a str),
    TokenProbe(&'a str),
}

impl<'a> VerificationPath<'a> {
    fn for_request(request: &'a CredentialRequest) -> Self {
        match request.id_token() {
            Some(id_token) => VerificationPath::SignedToken(id_token),
            None => VerificationPath::TokenProbe(&request.github_token),
        }
    }
}

/// Verify the caller behind `request`
///
/// Returns the verified identity, or the error that rejected the caller.
pub async fn verify_caller(
    provider: &dyn IdentityProvider,
    request: &CredentialRequest,
) -> Result<VerifiedIdentity> {
    match VerificationPath::for_request(request) {
        VerificationPath::SignedToken(id_token) => verify_signed_token(provider, id_token).await,
        VerificationPath::TokenProbe(token) => probe_token(provider, request, token).await,
    }
}

async fn verify_signed_token(
    provider: &dyn IdentityProvider,
    id_token: &str,
) -> Result<VerifiedIdentity> {
    let claims = provider.parse_id_token(id_token).await.map_err(|e| {
        warn!(error = %e, "SECURITY: identity token rejected");
        BrokerError::caller(format!("invalid identity token: {}", e))
    })?;

    debug!(
        repository = %claims.repository,
        subject = %claims.subject,
        "Identity token verified"
    );
    Ok(VerifiedIdentity::IdToken(claims))
}

async fn probe_token(
    provider: &dyn IdentityProvider,
    request: &CredentialRequest,
    token: &str,
) -> Result<VerifiedIdentity> {
    // offline checks first: rejected callers must not cause outbound calls
    let kind = check_token_kind(token)?;
    let repository = RepositoryName::parse(&request.repository)?;

    let status = CreateStatusRequest {
        state: CommitState::Success,
        target_url: String::new(),
        description: COMMIT_STATUS_DESCRIPTION.into(),
        context: COMMIT_STATUS_CONTEXT.into(),
    };

    let response = provider
        .create_status(token, &repository.owner, &repository.name, &request.sha, &status)
        .await
        .map_err(|e| match e.status() {
            Some(status) if (400..500).contains(&status) => {
                BrokerError::caller(INSUFFICIENT_PERMISSION)
            }
            _ => BrokerError::from(e),
        })?;

    match response.creator {
        Some(creator) if creator.is_automation_bot() => {
            debug!(repository = %repository, kind = ?kind, "Token verified by status probe");
            Ok(VerifiedIdentity::AutomationToken(request.declared_identity()))
        }
        creator => {
            warn!(
                repository = %repository,
                creator = ?creator.as_ref().map(|c| c.login.as_str()),
                "SECURITY: commit status created by an unexpected principal"
            );
            Err(BrokerError::caller(NOT_AUTOMATION_BOT))
        }
    }
}
