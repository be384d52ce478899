//! API error types and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use keyless_core::{BrokerError, ErrorResponse};
use thiserror::Error;
use tracing::{error, info};

/// Message returned for every internal failure
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// API error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Caller-caused; the message is returned verbatim
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal; the message is only logged
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Record the real error before it is mapped to a response
    pub fn log(&self) {
        match self {
            ApiError::BadRequest(msg) => info!(message = %msg, "Request rejected"),
            ApiError::Internal(msg) => error!(message = %msg, "Request failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Internal(_) => INTERNAL_SERVER_ERROR.to_string(),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Caller(msg) => ApiError::BadRequest(msg),
            BrokerError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_caller_message_returned() {
        let err: ApiError = BrokerError::caller("invalid repository name: x").into();
        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"message": "invalid repository name: x"}));
    }

    #[tokio::test]
    async fn test_internal_message_hidden() {
        let err: ApiError = BrokerError::internal("dial tcp 10.0.0.1:443: i/o timeout").into();
        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({"message": "Internal Server Error"}));
    }
}
