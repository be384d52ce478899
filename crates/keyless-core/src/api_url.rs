//! Identity-provider base URL canonicalization
//!
//! The broker talks to exactly one identity-provider deployment. Callers
//! report the API URL their job was configured with, and it must canonicalize
//! to the broker's own base URL.

use std::fmt;
use url::Url;

use crate::error::{BrokerError, Result};

/// Public identity-provider API
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Canonical identity-provider base URL
///
/// Built once at start-up and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiBaseUrl(String);

impl ApiBaseUrl {
    /// Canonicalize a configured base URL
    pub fn parse(raw: &str) -> Result<Self> {
        canonical_url(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the public API rather than a self-hosted deployment
    pub fn is_public_default(&self) -> bool {
        self.0 == DEFAULT_API_BASE_URL
    }

    /// Check a caller-reported API URL against this base URL
    ///
    /// An empty value stands for the public API.
    pub fn verify(&self, requested: &str) -> Result<()> {
        let requested = if requested.is_empty() {
            DEFAULT_API_BASE_URL
        } else {
            requested
        };

        let canonical = canonical_url(requested)?;
        if canonical == self.0 {
            return Ok(());
        }

        if self.is_public_default() {
            Err(BrokerError::caller(
                "it looks that you use GitHub Enterprise Server, \
                 but the credential provider doesn't support it. \
                 I recommend you to build your own credential provider",
            ))
        } else {
            Err(BrokerError::caller(
                "your api server is not verified by the credential provider",
            ))
        }
    }

    /// Join path segments onto the base URL, percent-encoding each one
    pub fn join_segments<I, S>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = Url::parse(&self.0)
            .map_err(|e| BrokerError::internal(format!("invalid base url {}: {}", self.0, e)))?;
        url.path_segments_mut()
            .map_err(|_| BrokerError::internal(format!("base url cannot be a base: {}", self.0)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Default for ApiBaseUrl {
    /// The public API
    fn default() -> Self {
        Self(DEFAULT_API_BASE_URL.to_string())
    }
}

impl fmt::Display for ApiBaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form of a URL
///
/// Missing scheme means `http`. Host is lower-cased, the scheme's default
/// port dropped, trailing slashes removed, query and fragment discarded.
pub fn canonical_url(raw: &str) -> Result<String> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| BrokerError::caller(format!("invalid api url {:?}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(BrokerError::caller(format!("unknown scheme: {}", other)));
        }
    }

    let host = url
        .host_str()
        .ok_or_else(|| BrokerError::caller(format!("invalid api url {:?}: missing host", raw)))?;

    let mut canonical = format!("{}://{}", url.scheme(), host.to_ascii_lowercase());
    // `port()` is None when the port equals the scheme default
    if let Some(port) = url.port() {
        canonical.push_str(&format!(":{}", port));
    }
    canonical.push_str(url.path().trim_end_matches('/'));

    Ok(canonical)
}
