//! Core logic for the credential broker

mod broker;
mod exchange;
mod resolver;
mod verifier;

pub use broker::{CredentialBroker, NODE_ID_MIGRATION_DOCS};
pub use exchange::{
    ExchangeEngine, ExchangeOutcome, ExchangeRequest, ScopedTrustPolicy, PROBE_DURATION_SECONDS,
};
pub use resolver::{resolve, ResolvedIdentity};
pub use verifier::{verify_caller, COMMIT_STATUS_CONTEXT, COMMIT_STATUS_DESCRIPTION};
