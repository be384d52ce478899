//! Collaborator implementations

pub mod github;
pub mod mock;
pub mod oidc;
pub mod sts;

pub use github::{http_client, GitHubClient, USER_AGENT};
pub use mock::{MockIdentityProvider, MockRoleAssumer, ProviderCall, TrustPolicy};
pub use oidc::{IdTokenVerifier, DEFAULT_JWKS_URL, GITHUB_ACTIONS_ISSUER};
pub use sts::StsRoleAssumer;
