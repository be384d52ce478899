//! Identity-provider token taxonomy
//!
//! Token kinds are recognizable by a four character prefix
//! (<https://github.blog/changelog/2021-03-31-authentication-token-format-updates-are-generally-available/>).
//! Only server-to-server installation tokens, which is what a CI job's
//! built-in token is, can pass. Everything else is rejected before the broker
//! makes any outbound call with it.

use crate::error::{BrokerError, Result};

const USE_BUILTIN_TOKEN: &str =
    "`github-token` must be `${{ github.token }}` or `${{ secrets.GITHUB_TOKEN }}`.";

/// Kind of identity-provider token, by prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `ghp_`
    PersonalAccess,
    /// `gho_`
    OAuth,
    /// `ghu_`
    UserToServer,
    /// `ghs_`, the only accepted kind
    ServerToServer,
    /// `ghr_`
    Refresh,
    /// No recognized prefix: pre-2021 personal access token format
    LegacyPersonalAccess,
}

impl TokenKind {
    /// Classify a token by its prefix
    pub fn classify(token: &str) -> Self {
        match token.get(..4) {
            Some("ghp_") => TokenKind::PersonalAccess,
            Some("gho_") => TokenKind::OAuth,
            Some("ghu_") => TokenKind::UserToServer,
            Some("ghs_") => TokenKind::ServerToServer,
            Some("ghr_") => TokenKind::Refresh,
            _ => TokenKind::LegacyPersonalAccess,
        }
    }

    /// Human-readable description used in rejection messages
    pub fn description(&self) -> &'static str {
        match self {
            TokenKind::PersonalAccess | TokenKind::LegacyPersonalAccess => "Personal Access Token",
            TokenKind::OAuth => "OAuth Access token",
            TokenKind::UserToServer => "GitHub App user-to-server token",
            TokenKind::ServerToServer => "GitHub App server-to-server token",
            TokenKind::Refresh => "GitHub App refresh token",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, TokenKind::ServerToServer)
    }
}

/// Check a token's format and kind without contacting anyone
///
/// Returns the kind for accepted tokens, a caller-caused error otherwise.
pub fn check_token_kind(token: &str) -> Result<TokenKind> {
    if token.chars().count() < 4 {
        return Err(BrokerError::caller("GITHUB_TOKEN has invalid format"));
    }

    let kind = TokenKind::classify(token);
    if kind.is_accepted() {
        Ok(kind)
    } else {
        Err(BrokerError::caller(format!(
            "GITHUB_TOKEN looks like {}. {}",
            kind.description(),
            USE_BUILTIN_TOKEN
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_prefixes() {
        assert_eq!(TokenKind::classify("ghp_abc"), TokenKind::PersonalAccess);
        assert_eq!(TokenKind::classify("gho_abc"), TokenKind::OAuth);
        assert_eq!(TokenKind::classify("ghu_abc"), TokenKind::UserToServer);
        assert_eq!(TokenKind::classify("ghs_abc"), TokenKind::ServerToServer);
        assert_eq!(TokenKind::classify("ghr_abc"), TokenKind::Refresh);
        assert_eq!(
            TokenKind::classify("0123456789abcdef0123456789abcdef01234567"),
            TokenKind::LegacyPersonalAccess
        );
    }

    #[test]
    fn test_only_server_to_server_accepted() {
        assert_eq!(check_token_kind("ghs_dummy").unwrap(), TokenKind::ServerToServer);

        for token in ["ghp_x", "gho_x", "ghu_x", "ghr_x", "legacytoken"] {
            let err = check_token_kind(token).unwrap_err();
            assert!(err.is_caller_caused(), "{token} must be rejected as caller-caused");
            assert!(err.message().contains("${{ github.token }}"));
        }
    }

    #[test]
    fn test_short_token_is_invalid_format() {
        let err = check_token_kind("ghs").unwrap_err();
        assert_eq!(err, BrokerError::caller("GITHUB_TOKEN has invalid format"));
        assert!(check_token_kind("").is_err());
    }

    #[test]
    fn test_multibyte_prefix_does_not_panic() {
        assert_eq!(TokenKind::classify("ğhs_x"), TokenKind::LegacyPersonalAccess);
        assert!(check_token_kind("éééé").is_err());
    }
}
