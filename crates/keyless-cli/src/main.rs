//! CI-side client binary
//!
//! Requests credentials from the broker and exports them to the job.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use keyless_cli::{
    append_env_file, build_request, export_commands, exports, mask_commands, request_credentials,
    warning_command, Args, CiEnvironment,
};

const USER_AGENT: &str = concat!("keyless-assume-role/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let request = build_request(&args, &CiEnvironment::from_env());

    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("build HTTP client")?;

    let result = request_credentials(&http, &args.provider_endpoint, &request)
        .await
        .context("assume role")?;

    print!("{}", mask_commands(&result));
    if let Some(warning) = &result.warning {
        println!("{}", warning_command(warning));
    }

    let vars = exports(&result, &args.aws_region);
    match std::env::var_os("GITHUB_ENV").map(PathBuf::from) {
        Some(path) => {
            append_env_file(&path, &vars)?;
            info!(path = %path.display(), "Exported credentials");
        }
        None => print!("{}", export_commands(&vars)),
    }

    Ok(())
}
