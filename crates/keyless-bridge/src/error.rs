//! Error types for the identity-provider and role-assumption collaborators

use keyless_core::BrokerError;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur while talking to the identity provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The REST API answered with a status other than the expected one
    #[error("unexpected status code: {status}")]
    UnexpectedStatus { status: u16 },

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Identity token failed signature, issuer, expiry or format checks
    #[error("failed to parse id token: {0}")]
    InvalidIdToken(String),

    /// Signing-key set could not be fetched
    #[error("failed to get JWK Set: {0}")]
    Jwks(String),

    /// No key in the signing-key set matches the token
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Token signed with an algorithm outside the allow-list
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The key's declared algorithm disagrees with the token header
    #[error("alg parameter mismatch")]
    AlgorithmMismatch,

    /// Request parameter rejected before any request was sent
    #[error("{0}")]
    InvalidParameter(String),

    /// Caller's API URL does not match the configured deployment
    #[error("{0}")]
    UnsupportedApiUrl(String),
}

impl BridgeError {
    /// HTTP status of an unexpected REST response
    pub fn status(&self) -> Option<u16> {
        match self {
            BridgeError::UnexpectedStatus { status } => Some(*status),
            _ => None,
        }
    }

    /// Whether the caller's request, not the infrastructure, is at fault
    pub fn is_caller_caused(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidParameter(_) | BridgeError::UnsupportedApiUrl(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for BridgeError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => BridgeError::InvalidIdToken("token expired".into()),
            ErrorKind::ImmatureSignature => BridgeError::InvalidIdToken("token not yet valid".into()),
            ErrorKind::InvalidIssuer => BridgeError::InvalidIdToken("invalid issuer".into()),
            ErrorKind::InvalidAlgorithm => BridgeError::AlgorithmMismatch,
            _ => BridgeError::InvalidIdToken(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BridgeError::Decode(err.to_string())
        } else {
            BridgeError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Decode(err.to_string())
    }
}

impl From<BridgeError> for BrokerError {
    fn from(err: BridgeError) -> Self {
        if err.is_caller_caused() {
            BrokerError::caller(err.to_string())
        } else {
            BrokerError::internal(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err: BrokerError = BridgeError::InvalidParameter("invalid owner name: \"a b\"".into()).into();
        assert!(err.is_caller_caused());

        let err: BrokerError =
            BridgeError::UnsupportedApiUrl("your api server is not verified".into()).into();
        assert!(err.is_caller_caused());

        let err: BrokerError = BridgeError::UnexpectedStatus { status: 502 }.into();
        assert!(!err.is_caller_caused());
        assert_eq!(err.message(), "unexpected status code: 502");
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(BridgeError::UnexpectedStatus { status: 404 }.status(), Some(404));
        assert_eq!(BridgeError::Http("reset".into()).status(), None);
    }
}
