use anyhow::{Context, Result};
use keyless_bridge::clients::DEFAULT_JWKS_URL;
use keyless_core::{ApiBaseUrl, DEFAULT_API_BASE_URL};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Broker configuration sourced from environment variables
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub bind_addr: SocketAddr,
    pub api_base_url: ApiBaseUrl,
    pub jwks_url: String,
    pub request_timeout: Duration,
    pub log_level: Level,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            api_base_url: ApiBaseUrl::default(),
            jwks_url: DEFAULT_JWKS_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_level: Level::INFO,
        }
    }
}

impl BrokerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset and empty mean default
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let bind_addr = var("KEYLESS_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse KEYLESS_BIND")?;
        let api_url = var("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = ApiBaseUrl::parse(&api_url)
            .with_context(|| format!("parse GITHUB_API_URL: {api_url}"))?;
        let jwks_url = var("KEYLESS_OIDC_JWKS_URL").unwrap_or_else(|| DEFAULT_JWKS_URL.to_string());
        let timeout_secs = var("KEYLESS_REQUEST_TIMEOUT_SECS")
            .map(|value| value.parse::<u64>())
            .transpose()
            .with_context(|| "parse KEYLESS_REQUEST_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let log_level = var("KEYLESS_LOG_LEVEL")
            .map(|value| value.parse::<Level>())
            .transpose()
            .with_context(|| "parse KEYLESS_LOG_LEVEL")?
            .unwrap_or(Level::INFO);

        Ok(Self {
            bind_addr,
            api_base_url,
            jwks_url,
            request_timeout: Duration::from_secs(timeout_secs),
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Result<BrokerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BrokerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND);
        assert!(config.api_base_url.is_public_default());
        assert_eq!(config.jwks_url, DEFAULT_JWKS_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("KEYLESS_BIND", "127.0.0.1:9000"),
            ("GITHUB_API_URL", "https://GHE.example.com/api/v3/"),
            ("KEYLESS_REQUEST_TIMEOUT_SECS", "5"),
            ("KEYLESS_LOG_LEVEL", "debug"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.api_base_url.as_str(), "https://ghe.example.com/api/v3");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn test_empty_api_url_is_default() {
        let config = from_map(&[("GITHUB_API_URL", "")]).unwrap();
        assert!(config.api_base_url.is_public_default());
    }

    #[test]
    fn test_invalid_values_abort() {
        assert!(from_map(&[("GITHUB_API_URL", "ftp://example.com")]).is_err());
        assert!(from_map(&[("KEYLESS_BIND", "not-an-addr")]).is_err());
        assert!(from_map(&[("KEYLESS_REQUEST_TIMEOUT_SECS", "soon")]).is_err());
    }
}
