//! Trust policy probe and credential exchange
//!
//! Role assumption happens in two phases:
//!
//! 1. **Probe**: assume the role *without* an external id. A properly scoped
//!    trust policy denies this. If it succeeds, anyone who knows the role ARN
//!    could assume the role through this service, so the request stops and
//!    the probe credentials are dropped.
//! 2. **Exchange**: assume the role with the derived external id and the
//!    caller's requested duration.
//!
//! The exchange phase can only be entered with a [`ScopedTrustPolicy`],
//! which only an access-denied probe produces.

use keyless_bridge::{AssumeRoleFailure, AssumeRoleParams, IssuedCredentials, RoleAssumer};
use keyless_core::{BrokerError, ExternalIdentity, Result, SessionTagSet};
use tracing::{debug, warn};

/// Probe duration, the shortest the role-assumption API accepts
pub const PROBE_DURATION_SECONDS: i32 = 900;

const TRUST_POLICY_TOO_OPEN: &str =
    "The AssumeRolePolicy of your IAM Role is too open. Please configure ExternalId conditions.";

/// Everything the two phases need
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    pub role_arn: String,
    pub session_name: String,
    /// Verified repository, for logging only
    pub repository: String,
    pub tags: SessionTagSet,
    pub external_id: ExternalIdentity,
    /// `None` leaves the duration to the role default
    pub duration_seconds: Option<i32>,
}

/// Proof that the role denied assumption without an external id
#[derive(Debug)]
pub struct ScopedTrustPolicy {
    _private: (),
}

/// Terminal state of an exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The probe succeeded; the trust policy needs an external id condition
    TooOpen,
    /// The probe failed for a reason other than access denied
    ProbeInfraError(String),
    /// The exchange issued credentials
    Issued(IssuedCredentials),
    /// The trust policy rejected the derived external id
    AccessDenied { message: String, external_id: String },
    /// The exchange failed for a reason other than access denied
    ExchangeInfraError(String),
}

impl ExchangeOutcome {
    /// Collapse into credentials or the broker error for this state
    pub fn into_result(self) -> Result<IssuedCredentials> {
        match self {
            ExchangeOutcome::Issued(credentials) => Ok(credentials),
            ExchangeOutcome::TooOpen => Err(BrokerError::caller(TRUST_POLICY_TOO_OPEN)),
            ExchangeOutcome::AccessDenied {
                message,
                external_id,
            } => Err(BrokerError::caller(format!(
                "AWS denied your access: {}, please check your trust policy accepts {:?} as sts:ExternalId.",
                message, external_id
            ))),
            ExchangeOutcome::ProbeInfraError(message)
            | ExchangeOutcome::ExchangeInfraError(message) => Err(BrokerError::internal(message)),
        }
    }

    pub fn is_issued(&self) -> bool {
        matches!(self, ExchangeOutcome::Issued(_))
    }
}

enum ExchangeState {
    Probing,
    Exchanging(ScopedTrustPolicy),
    Done(ExchangeOutcome),
}

/// Runs the probe-then-exchange state machine against a [`RoleAssumer`]
pub struct ExchangeEngine<'a> {
    assumer: &'a dyn RoleAssumer,
}

impl<'a> ExchangeEngine<'a> {
    pub fn new(assumer: &'a dyn RoleAssumer) -> Self {
        Self { assumer }
    }

    /// Drive `request` to a terminal state
    ///
    /// Each phase calls the role-assumption API exactly once.
    pub async fn run(&self, request: &ExchangeRequest) -> ExchangeOutcome {
        let mut state = ExchangeState::Probing;
        loop {
            state = match state {
                ExchangeState::Probing => self.probe(request).await,
                ExchangeState::Exchanging(proof) => {
                    ExchangeState::Done(self.exchange(proof, request).await)
                }
                ExchangeState::Done(outcome) => return outcome,
            };
        }
    }

    async fn probe(&self, request: &ExchangeRequest) -> ExchangeState {
        let params = AssumeRoleParams {
            role_arn: request.role_arn.clone(),
            session_name: request.session_name.clone(),
            duration_seconds: Some(PROBE_DURATION_SECONDS),
            external_id: None,
            tags: request.tags.clone(),
        };

        match self.assumer.assume_role(&params).await {
            Ok(_discarded) => {
                warn!(
                    role_arn = %request.role_arn,
                    repository = %request.repository,
                    "SECURITY: role can be assumed without an external id"
                );
                ExchangeState::Done(ExchangeOutcome::TooOpen)
            }
            Err(AssumeRoleFailure::AccessDenied { .. }) => {
                debug!(role_arn = %request.role_arn, "Trust policy requires an external id");
                ExchangeState::Exchanging(ScopedTrustPolicy { _private: () })
            }
            Err(AssumeRoleFailure::Other(message)) => {
                ExchangeState::Done(ExchangeOutcome::ProbeInfraError(message))
            }
        }
    }

    async fn exchange(&self, _proof: ScopedTrustPolicy, request: &ExchangeRequest) -> ExchangeOutcome {
        let params = AssumeRoleParams {
            role_arn: request.role_arn.clone(),
            session_name: request.session_name.clone(),
            duration_seconds: request.duration_seconds,
            external_id: Some(request.external_id.as_str().to_string()),
            tags: request.tags.clone(),
        };

        match self.assumer.assume_role(&params).await {
            Ok(credentials) => ExchangeOutcome::Issued(credentials),
            Err(AssumeRoleFailure::AccessDenied { message }) => {
                warn!(
                    role_arn = %request.role_arn,
                    repository = %request.repository,
                    external_id = %request.external_id,
                    "Trust policy rejected the external id"
                );
                ExchangeOutcome::AccessDenied {
                    message,
                    external_id: request.external_id.as_str().to_string(),
                }
            }
            Err(AssumeRoleFailure::Other(message)) => ExchangeOutcome::ExchangeInfraError(message),
        }
    }
}
