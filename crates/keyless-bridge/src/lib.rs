//! Keyless Bridge
//!
//! The broker's two outbound collaborators, each behind a capability trait
//! with exactly the methods the broker calls:
//!
//! - [`IdentityProvider`]: create-commit-status, repository and user node-id
//!   lookups, identity-token verification, API URL validation
//! - [`RoleAssumer`]: a single role-assumption call
//!
//! ## Implementations
//!
//! - **GitHub**: REST client plus OIDC token verification against the
//!   issuer's JWKS ([`clients::GitHubClient`])
//! - **AWS STS**: `sts:AssumeRole` via the AWS SDK ([`clients::StsRoleAssumer`])
//! - **Mock**: deterministic, call-recording fakes for tests
//!
//! ## Usage
//!
//! ```ignore
//! use keyless_bridge::clients::*;
//!
//! let http = http_client()?;
//! let github = GitHubClient::new(
//!     http.clone(),
//!     ApiBaseUrl::default(),
//!     IdTokenVerifier::new(http, DEFAULT_JWKS_URL),
//! );
//! github.validate_api_url("https://api.github.com")?;
//! let claims = github.parse_id_token("eyJ...").await?;
//! ```

pub mod assumer;
pub mod clients;
pub mod error;
pub mod provider;
pub mod types;

pub use assumer::RoleAssumer;
pub use error::{BridgeError, Result};
pub use provider::IdentityProvider;
pub use types::{
    AssumeRoleFailure, AssumeRoleParams, CommitState, CreateStatusRequest, CreateStatusResponse,
    IssuedCredentials, NodeResponse, StatusCreator,
};
