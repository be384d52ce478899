//! External identity resolution
//!
//! Decides which repository and actor names the role gets to see, and the
//! external id its trust policy must match. Names always come from the
//! verified identity, never from free-form request fields when signed claims
//! exist.

use keyless_bridge::IdentityProvider;
use keyless_core::{
    CredentialRequest, ExternalIdentity, IdFormat, RepositoryName, ResolvedNames, Result,
    VerifiedIdentity,
};
use tracing::debug;

/// Output of one resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub names: ResolvedNames,
    pub external_id: ExternalIdentity,
}

/// Resolve names and external id for `identity`
///
/// Node ids are looked up (in `format`) only when the request opts into
/// node-id mode; otherwise no outbound call is made.
pub async fn resolve(
    provider: &dyn IdentityProvider,
    identity: &VerifiedIdentity,
    request: &CredentialRequest,
    format: IdFormat,
) -> Result<ResolvedIdentity> {
    let repository = RepositoryName::parse(identity.repository())?;
    let actor = identity.actor();

    if !request.use_node_id {
        let external_id = ExternalIdentity::derive(
            &repository.full_name(),
            None,
            &request.obfuscate_repository,
        )?;
        return Ok(ResolvedIdentity {
            names: ResolvedNames {
                repository: repository.full_name(),
                actor: actor.to_string(),
                node_id_mode: false,
            },
            external_id,
        });
    }

    let token = &request.github_token;
    let repo_node = provider
        .get_repo(format, token, &repository.owner, &repository.name)
        .await?;
    let user_node = provider.get_user(format, token, actor).await?;

    debug!(
        repository = %repository,
        format = %format,
        node_id = %repo_node.node_id,
        "Resolved repository node id"
    );

    let external_id = ExternalIdentity::derive(
        &repository.full_name(),
        Some(&repo_node.node_id),
        &request.obfuscate_repository,
    )?;
    Ok(ResolvedIdentity {
        names: ResolvedNames {
            repository: repo_node.node_id,
            actor: user_node.node_id,
            node_id_mode: true,
        },
        external_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyless_bridge::clients::{MockIdentityProvider, ProviderCall};
    use keyless_bridge::BridgeError;
    use keyless_core::{DeclaredIdentity, IdTokenClaims};

    fn declared() -> VerifiedIdentity {
        VerifiedIdentity::AutomationToken(DeclaredIdentity {
            repository: "fuller-inc/actions-aws-assume-role".into(),
            actor: "shogo82148".into(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_plain_mode_makes_no_calls() {
        let github = MockIdentityProvider::new();
        let req = CredentialRequest::default();

        let resolved = resolve(&github, &declared(), &req, IdFormat::Next).await.unwrap();
        assert_eq!(resolved.external_id.as_str(), "fuller-inc/actions-aws-assume-role");
        assert_eq!(resolved.names.actor, "shogo82148");
        assert!(!resolved.names.node_id_mode);
        assert!(!github.made_outbound_call());
    }

    #[tokio::test]
    async fn test_sha256_mode() {
        let github = MockIdentityProvider::new();
        let req = CredentialRequest {
            obfuscate_repository: "sha256".into(),
            ..Default::default()
        };

        let resolved = resolve(&github, &declared(), &req, IdFormat::Next).await.unwrap();
        assert_eq!(
            resolved.external_id.as_str(),
            "sha256:339c2238399e1150eb8d76a7a74cfd92448d347dc4212bad33a4978edfc455e0"
        );
        // tags still carry the readable name
        assert_eq!(resolved.names.repository, "fuller-inc/actions-aws-assume-role");
    }

    #[tokio::test]
    async fn test_signed_claims_win_over_request_fields() {
        let github = MockIdentityProvider::new();
        let identity = VerifiedIdentity::IdToken(IdTokenClaims {
            repository: "fuller-inc/actions-aws-assume-role".into(),
            actor: "shogo82148".into(),
            ..Default::default()
        });
        let req = CredentialRequest {
            repository: "attacker/repo".into(),
            actor: "attacker".into(),
            ..Default::default()
        };

        let resolved = resolve(&github, &identity, &req, IdFormat::Next).await.unwrap();
        assert_eq!(resolved.external_id.as_str(), "fuller-inc/actions-aws-assume-role");
        assert_eq!(resolved.names.actor, "shogo82148");
    }

    #[tokio::test]
    async fn test_node_id_mode_uses_requested_format() {
        let github = MockIdentityProvider::new()
            .with_repo_node_ids(Ok("R_next"), Ok("MDEw_legacy"))
            .with_user_node_ids(Ok("U_next"), Ok("MDQ_legacy"));
        let req = CredentialRequest {
            github_token: "ghs_dummy".into(),
            use_node_id: true,
            ..Default::default()
        };

        let resolved = resolve(&github, &declared(), &req, IdFormat::Legacy).await.unwrap();
        assert_eq!(resolved.external_id.as_str(), "MDEw_legacy");
        assert_eq!(resolved.names.repository, "MDEw_legacy");
        assert_eq!(resolved.names.actor, "MDQ_legacy");
        assert!(resolved.names.node_id_mode);
        assert_eq!(
            github.calls(),
            vec![
                ProviderCall::GetRepo {
                    format: IdFormat::Legacy,
                    owner: "fuller-inc".into(),
                    repo: "actions-aws-assume-role".into(),
                },
                ProviderCall::GetUser {
                    format: IdFormat::Legacy,
                    user: "shogo82148".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let github = MockIdentityProvider::new().with_repo_node_ids(
            Err(BridgeError::UnexpectedStatus { status: 404 }),
            Ok("MDEw"),
        );
        let req = CredentialRequest {
            use_node_id: true,
            ..Default::default()
        };

        let err = resolve(&github, &declared(), &req, IdFormat::Next).await.unwrap_err();
        assert_eq!(err.message(), "unexpected status code: 404");
        assert!(!err.is_caller_caused());
    }

    #[tokio::test]
    async fn test_unknown_obfuscation_rejected() {
        let github = MockIdentityProvider::new();
        let req = CredentialRequest {
            obfuscate_repository: "base64".into(),
            ..Default::default()
        };

        let err = resolve(&github, &declared(), &req, IdFormat::Next).await.unwrap_err();
        assert_eq!(err.message(), "invalid obfuscate repository type: base64");
    }
}
