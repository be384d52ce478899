//! Keyless Assume-Role Client
//!
//! Runs inside a CI job: collects the job's identity from the environment,
//! asks a keyless broker for role credentials and exports them to the
//! following steps.
//!
//! Secret values are masked in the job log before they are exported.

use clap::Parser;
use keyless_core::{CredentialRequest, CredentialResult, ErrorResponse};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Prefix of the heredoc delimiters written to the job's environment file
pub const ENV_DELIMITER_PREFIX: &str = "ghadelimiter_";

/// Errors that can occur while requesting credentials
#[derive(Error, Debug)]
pub enum ClientError {
    /// The broker answered with something other than 200
    #[error("{message}")]
    Broker { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode broker response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{name} collides with the environment file delimiter")]
    DelimiterCollision { name: String },

    #[error("failed to write {path}: {source}")]
    EnvFile {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(name = "keyless-assume-role")]
#[command(about = "Request short-lived AWS credentials from a keyless broker")]
pub struct Args {
    /// Broker endpoint to post the credential request to
    #[arg(long, env = "KEYLESS_PROVIDER_ENDPOINT")]
    pub provider_endpoint: String,

    /// ARN of the role to assume
    #[arg(long)]
    pub role_to_assume: String,

    #[arg(long, default_value = "GitHubActions")]
    pub role_session_name: String,

    /// Credential lifetime; 0 leaves it to the role default
    #[arg(long, default_value = "3600")]
    pub role_duration_seconds: i32,

    /// Region exported as AWS_REGION and AWS_DEFAULT_REGION
    #[arg(long, env = "AWS_REGION")]
    pub aws_region: String,

    /// The job's built-in token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Signed identity token of the job
    #[arg(long, env = "KEYLESS_ID_TOKEN", hide_env_values = true)]
    pub id_token: Option<String>,

    /// Use node ids as the external id
    #[arg(long)]
    pub use_node_id: bool,

    /// "sha256" to hash the repository name in the external id
    #[arg(long, default_value = "")]
    pub obfuscate_repository: String,

    /// Attach session tags describing the job
    #[arg(long)]
    pub role_session_tagging: bool,
}

/// The CI job's own description of itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiEnvironment {
    pub repository: String,
    pub sha: String,
    pub api_url: String,
    pub run_id: String,
    pub workflow: String,
    pub actor: String,
    pub git_ref: String,
}

impl CiEnvironment {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the job variables from an arbitrary source; unset means empty
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).unwrap_or_default();
        Self {
            repository: var("GITHUB_REPOSITORY"),
            sha: var("GITHUB_SHA"),
            api_url: var("GITHUB_API_URL"),
            run_id: var("GITHUB_RUN_ID"),
            workflow: var("GITHUB_WORKFLOW"),
            actor: var("GITHUB_ACTOR"),
            git_ref: var("GITHUB_REF"),
        }
    }
}

/// Assemble the request body sent to the broker
pub fn build_request(args: &Args, env: &CiEnvironment) -> CredentialRequest {
    CredentialRequest {
        github_token: args.github_token.clone(),
        id_token: args.id_token.clone().filter(|token| !token.is_empty()),
        role_to_assume: args.role_to_assume.clone(),
        role_session_name: args.role_session_name.clone(),
        duration_seconds: args.role_duration_seconds,
        repository: env.repository.clone(),
        use_node_id: args.use_node_id,
        obfuscate_repository: args.obfuscate_repository.clone(),
        api_url: env.api_url.clone(),
        sha: env.sha.clone(),
        role_session_tagging: args.role_session_tagging,
        run_id: env.run_id.clone(),
        workflow: env.workflow.clone(),
        actor: env.actor.clone(),
        branch: env.git_ref.clone(),
    }
}

/// Post `request` to the broker and decode its answer
pub async fn request_credentials(
    http: &reqwest::Client,
    endpoint: &str,
    request: &CredentialRequest,
) -> Result<CredentialResult, ClientError> {
    debug!(endpoint = %endpoint, repository = %request.repository, "Requesting credentials");

    let response = http.post(endpoint).json(request).send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    if status != reqwest::StatusCode::OK {
        let message = serde_json::from_slice::<ErrorResponse>(&body)
            .map(|err| err.message)
            .unwrap_or_else(|_| format!("unexpected status code: {}", status.as_u16()));
        return Err(ClientError::Broker {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_slice(&body)?)
}

/// Variables exported to the following steps, in export order
pub fn exports(result: &CredentialResult, region: &str) -> Vec<(&'static str, String)> {
    vec![
        ("AWS_ACCESS_KEY_ID", result.access_key_id.clone()),
        ("AWS_SECRET_ACCESS_KEY", result.secret_access_key.clone()),
        ("AWS_SESSION_TOKEN", result.session_token.clone()),
        ("AWS_REGION", region.to_string()),
        ("AWS_DEFAULT_REGION", region.to_string()),
    ]
}

/// Workflow commands masking the secret values in the job log
pub fn mask_commands(result: &CredentialResult) -> String {
    [
        &result.access_key_id,
        &result.secret_access_key,
        &result.session_token,
    ]
    .iter()
    .fold(String::new(), |mut out, secret| {
        let _ = writeln!(out, "::add-mask::{}", secret);
        out
    })
}

/// Workflow command surfacing a broker warning on the job summary
pub fn warning_command(warning: &str) -> String {
    let escaped = warning
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::warning::{}", escaped)
}

/// Shell `export` lines, for running outside a job
pub fn export_commands(vars: &[(&'static str, String)]) -> String {
    vars.iter().fold(String::new(), |mut out, (name, value)| {
        let _ = writeln!(out, "export {}={}", name, shell_quote(value));
        out
    })
}

/// One environment-file entry in `NAME<<delimiter` form
///
/// A value spanning several lines stays a single variable.
pub fn env_file_entry(name: &str, value: &str, delimiter: &str) -> Result<String, ClientError> {
    if name.contains(delimiter) || value.contains(delimiter) {
        return Err(ClientError::DelimiterCollision {
            name: name.to_string(),
        });
    }
    Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}

/// Append `vars` to the job's environment file
///
/// Nothing is written unless every entry can be encoded.
pub fn append_env_file(path: &Path, vars: &[(&'static str, String)]) -> Result<(), ClientError> {
    let delimiter = format!("{}{}", ENV_DELIMITER_PREFIX, Uuid::new_v4());
    let entries = vars
        .iter()
        .map(|(name, value)| env_file_entry(name, value, &delimiter))
        .collect::<Result<String, _>>()?;

    let env_file_error = |source| ClientError::EnvFile {
        path: path.display().to_string(),
        source,
    };

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(env_file_error)?;
    file.write_all(entries.as_bytes()).map_err(env_file_error)
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
