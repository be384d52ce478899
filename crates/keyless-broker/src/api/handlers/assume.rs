//! Credential Request Handler
//!
//! Parses the raw request body, runs the broker under the per-request
//! deadline and maps the outcome to a response.

use axum::{body::Bytes, extract::State, Json};
use keyless_core::{BrokerError, CredentialRequest, CredentialResult};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::config::BrokerConfig;
use crate::core::CredentialBroker;

/// Application state shared across handlers
pub struct AppState {
    /// Request orchestration with its collaborators
    pub broker: CredentialBroker,
    /// Immutable broker configuration
    pub config: BrokerConfig,
}

/// Exchange a CI identity for role credentials
///
/// POST / and POST /assume-role
///
/// A malformed body is a caller-caused rejection like any other.
pub async fn assume_role(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CredentialResult>, ApiError> {
    let span = info_span!("assume_role", request_id = %Uuid::new_v4());

    let result = tokio::time::timeout(state.config.request_timeout, handle_body(&state, &body))
        .instrument(span.clone())
        .await
        .unwrap_or_else(|_| Err(BrokerError::internal("request deadline exceeded")));

    result.map(Json).map_err(|err| {
        let err = ApiError::from(err);
        span.in_scope(|| err.log());
        err
    })
}

async fn handle_body(state: &AppState, body: &[u8]) -> Result<CredentialResult, BrokerError> {
    let request: CredentialRequest = serde_json::from_slice(body).map_err(|e| {
        BrokerError::caller(format!("failed to unmarshal the request body: {}", e))
    })?;

    debug!(
        repository = %request.repository,
        role_arn = %request.role_to_assume,
        id_token = request.id_token().is_some(),
        use_node_id = request.use_node_id,
        "Credential request received"
    );

    state.broker.handle(&request).await
}
