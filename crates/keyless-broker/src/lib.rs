//! Keyless Broker
//!
//! HTTP service that exchanges a CI job's identity for short-lived AWS
//! credentials. No long-lived cloud secret ever reaches the job.
//!
//! ## Request Flow
//!
//! 1. **Validate** the job's `api_url` against the configured identity
//!    provider
//! 2. **Verify** the caller: a signed identity token, or a commit-status probe
//!    proving the REST token belongs to the automation bot
//! 3. **Resolve** the external id bound to the verified repository
//! 4. **Probe** the role without an external id; success means the trust
//!    policy is too open
//! 5. **Exchange** with the external id and return the credentials
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness check
//! - `POST /` - Exchange an identity for credentials
//! - `POST /assume-role` - Same as `POST /`

pub mod api;
pub mod config;
pub mod core;

pub use api::create_router;
pub use api::handlers::AppState;
pub use config::BrokerConfig;
pub use crate::core::CredentialBroker;
