//! Credential Broker Binary
//!
//! Runs the credential broker HTTP server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use keyless_bridge::clients::{http_client, GitHubClient, IdTokenVerifier, StsRoleAssumer};
use keyless_broker::{create_router, AppState, BrokerConfig, CredentialBroker};

#[tokio::main]
async fn main() {
    let config = BrokerConfig::from_env().expect("Invalid broker configuration");

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Collaborators
    let http = http_client().expect("Failed to build HTTP client");
    let github = GitHubClient::new(
        http.clone(),
        config.api_base_url.clone(),
        IdTokenVerifier::new(http, config.jwks_url.clone()),
    );

    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let sts = StsRoleAssumer::from_sdk_config(&aws);

    info!(
        api_url = %config.api_base_url,
        jwks_url = %config.jwks_url,
        timeout_secs = config.request_timeout.as_secs(),
        "Starting credential broker"
    );

    let broker = CredentialBroker::new(Arc::new(github), Arc::new(sts));
    let addr = config.bind_addr;
    let state = Arc::new(AppState { broker, config });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %addr, "Credential broker listening");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
