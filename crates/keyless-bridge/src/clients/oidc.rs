//! CI identity-token verification
//!
//! Tokens are verified against the issuer's published signing keys, fetched
//! fresh for every verification. The header algorithm is pinned to the
//! allow-list before any key lookup happens, and the audience is decoded but
//! never checked: it is recorded as a session attribute instead.

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use keyless_core::IdTokenClaims;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{BridgeError, Result};

/// Fixed issuer of CI identity tokens
pub const GITHUB_ACTIONS_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// Published signing-key set of [`GITHUB_ACTIONS_ISSUER`]
pub const DEFAULT_JWKS_URL: &str = "https://token.actions.githubusercontent.com/.well-known/jwks";

/// Verifier for CI identity tokens
#[derive(Clone)]
pub struct IdTokenVerifier {
    http: reqwest::Client,
    jwks_url: String,
}

impl IdTokenVerifier {
    /// Create a verifier fetching keys from `jwks_url`
    pub fn new(http: reqwest::Client, jwks_url: impl Into<String>) -> Self {
        Self {
            http,
            jwks_url: jwks_url.into(),
        }
    }

    /// Fetch the issuer's current signing-key set
    pub async fn fetch_jwks(&self) -> Result<JwkSet> {
        debug!(url = %self.jwks_url, "Fetching JWKS");
        let response = self
            .http
            .get(&self.jwks_url)
            .header(ACCEPT, "application/jwk-set+json")
            .send()
            .await
            .map_err(|e| BridgeError::Jwks(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(BridgeError::Jwks(format!(
                "unexpected status code: {}",
                response.status().as_u16()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| BridgeError::Jwks(e.to_string()))
    }

    /// Verify a token and decode its claims
    pub async fn verify(&self, token: &str) -> Result<IdTokenClaims> {
        // Step 1: Pin the algorithm before touching the key set
        let header = decode_header(token)?;
        if !is_algorithm_allowed(header.alg) {
            return Err(BridgeError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| BridgeError::KeyNotFound("token header has no kid".into()))?;

        // Step 2: Find the signing key
        let jwks = self.fetch_jwks().await?;
        let jwk = jwks
            .find(kid)
            .ok_or_else(|| BridgeError::KeyNotFound(format!("kid {} is not found", kid)))?;
        ensure_jwk_matches_algorithm(jwk, header.alg)?;
        let decoding_key = DecodingKey::from_jwk(jwk)?;

        // Step 3: Signature, issuer and expiry; any audience is accepted
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[GITHUB_ACTIONS_ISSUER]);
        validation.validate_aud = false;
        validation.required_spec_claims.insert("iss".to_string());

        let token_data = decode::<IdTokenClaims>(token, &decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

fn is_algorithm_allowed(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::RS256)
}

/// A key that declares an algorithm must declare the token's one
fn ensure_jwk_matches_algorithm(jwk: &Jwk, alg: Algorithm) -> Result<()> {
    match (jwk.common.key_algorithm, alg) {
        (None, _) | (Some(KeyAlgorithm::RS256), Algorithm::RS256) => {}
        _ => return Err(BridgeError::AlgorithmMismatch),
    }
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Ok(()),
        _ => Err(BridgeError::UnsupportedAlgorithm("key type is not RSA".into())),
    }
}
