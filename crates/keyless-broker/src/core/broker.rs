//! Request handling
//!
//! Orchestrates one credential request end to end:
//! validate `api_url`, verify the caller, then resolve, tag and exchange.
//!
//! ## Node-id migration
//!
//! The identity provider hands out node ids in two encodings. In node-id mode
//! the downstream flow is tried with the next format first; if it fails, it is
//! retried exactly once with the legacy format. A successful retry carries a
//! migration warning. A failed retry reports the *first* error.

use std::sync::Arc;

use keyless_bridge::{IdentityProvider, RoleAssumer};
use keyless_core::{
    build_session_tags, BrokerError, CredentialRequest, CredentialResult, IdFormat, Result,
    SessionTagSet, VerifiedIdentity,
};
use tracing::{debug, info, warn};

use super::exchange::{ExchangeEngine, ExchangeRequest};
use super::resolver::resolve;
use super::verifier::verify_caller;

/// Where the node-id migration is documented
pub const NODE_ID_MIGRATION_DOCS: &str =
    "https://github.blog/2021-11-16-graphql-global-id-migration-update/";

/// Exchanges a verified CI identity for short-lived role credentials
pub struct CredentialBroker {
    provider: Arc<dyn IdentityProvider>,
    assumer: Arc<dyn RoleAssumer>,
}

impl CredentialBroker {
    pub fn new(provider: Arc<dyn IdentityProvider>, assumer: Arc<dyn RoleAssumer>) -> Self {
        info!(
            provider = provider.description(),
            assumer = assumer.description(),
            "Registered broker collaborators"
        );
        Self { provider, assumer }
    }

    /// Handle one credential request
    pub async fn handle(&self, request: &CredentialRequest) -> Result<CredentialResult> {
        self.provider.validate_api_url(&request.api_url)?;

        let identity = verify_caller(self.provider.as_ref(), request).await?;

        let err0 = match self.assume_role(&identity, request, IdFormat::Next).await {
            Ok(result) => return Ok(result),
            Err(err) if !request.use_node_id => return Err(err),
            Err(err) => err,
        };

        debug!(
            repository = %identity.repository(),
            error = %err0,
            "Next-format node ids failed, retrying with legacy format"
        );

        match self.assume_role(&identity, request, IdFormat::Legacy).await {
            Ok(mut result) => {
                warn!(
                    repository = %identity.repository(),
                    "Credentials issued with legacy node ids"
                );
                result.push_warning(&migration_warning(&err0));
                Ok(result)
            }
            Err(err1) => {
                debug!(error = %err1, "Legacy-format retry failed as well");
                Err(err0)
            }
        }
    }

    /// Resolve, tag and exchange with node ids in `format`
    async fn assume_role(
        &self,
        identity: &VerifiedIdentity,
        request: &CredentialRequest,
        format: IdFormat,
    ) -> Result<CredentialResult> {
        let resolved = resolve(self.provider.as_ref(), identity, request, format).await?;

        let tags = if request.role_session_tagging {
            build_session_tags(identity, &resolved.names)?
        } else {
            SessionTagSet::new()
        };

        let exchange = ExchangeRequest {
            role_arn: request.role_to_assume.clone(),
            session_name: request.role_session_name.clone(),
            repository: identity.repository().to_string(),
            tags,
            external_id: resolved.external_id,
            duration_seconds: request.requested_duration(),
        };

        let credentials = ExchangeEngine::new(self.assumer.as_ref())
            .run(&exchange)
            .await
            .into_result()?;

        info!(
            role_arn = %exchange.role_arn,
            repository = %exchange.repository,
            format = %format,
            "Issued credentials"
        );

        Ok(CredentialResult {
            access_key_id: credentials.access_key_id,
            secret_access_key: credentials.secret_access_key,
            session_token: credentials.session_token,
            warning: None,
        })
    }
}

fn migration_warning(err: &BrokerError) -> String {
    format!(
        "It looks that you use legacy node IDs. You need to migrate them. \
         See {} for more detail.\n{}",
        NODE_ID_MIGRATION_DOCS,
        err.message()
    )
}
