//! Error types for the credential broker

use thiserror::Error;

/// Result type alias using BrokerError
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors that can occur while brokering a credential
///
/// Every failure is one of two kinds. The kind decides what the caller
/// gets to see: caller-caused messages are actionable and returned verbatim,
/// internal messages stay in the server log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The request or the caller's environment is at fault
    #[error("{0}")]
    Caller(String),

    /// Transport, infrastructure or unexpected downstream failure
    #[error("{0}")]
    Internal(String),
}

impl BrokerError {
    /// Create a caller-caused error
    pub fn caller(message: impl Into<String>) -> Self {
        BrokerError::Caller(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        BrokerError::Internal(message.into())
    }

    /// Whether the message may be exposed to the caller
    pub fn is_caller_caused(&self) -> bool {
        matches!(self, BrokerError::Caller(_))
    }

    /// The message carried by this error, regardless of kind
    pub fn message(&self) -> &str {
        match self {
            BrokerError::Caller(msg) | BrokerError::Internal(msg) => msg,
        }
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        BrokerError::Internal(format!("Serialization error: {}", err))
    }
}
