//! # Keyless Core
//!
//! Domain logic for the keyless CI credential broker: a CI job proves who it
//! is and receives short-lived cloud credentials for one role, without ever
//! holding a long-lived cloud secret.
//!
//! This crate performs no I/O. Network collaborators live in
//! `keyless-bridge`, orchestration in `keyless-broker`.
//!
//! ## Key Concepts
//!
//! - **Verified identity**: claims of a signed identity token, or a REST token
//!   proven to belong to the CI automation identity
//! - **External id**: the string a role's trust policy requires, bound to the
//!   verified repository (confused-deputy prevention)
//! - **Session tags**: sanitized attributes attached to the issued session
//!
//! ## Error Kinds
//!
//! Every failure is either caller-caused (message returned verbatim) or
//! internal (message stays in the server log). See [`BrokerError`].

pub mod api_url;
pub mod error;
pub mod external_id;
pub mod sanitize;
pub mod tags;
pub mod token;
pub mod types;

pub use api_url::{canonical_url, ApiBaseUrl, DEFAULT_API_BASE_URL};
pub use error::{BrokerError, Result};
pub use external_id::{sha256_external_id, ExternalIdentity, ObfuscationMode, RepositoryName};
pub use sanitize::{sanitize_tag_value, TAG_VALUE_MAX_CHARS};
pub use tags::{build_session_tags, ResolvedNames, SessionTag, SessionTagSet};
pub use token::{check_token_kind, TokenKind};
pub use types::{
    CredentialRequest, CredentialResult, DeclaredIdentity, ErrorResponse, IdFormat,
    IdTokenClaims, VerifiedIdentity,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
