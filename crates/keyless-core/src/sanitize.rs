//! Session tag value sanitization
//!
//! STS accepts tag values matching `[\p{L}\p{Z}\p{N}_.:/=+\-@]*` with at most
//! 256 characters. Values derived from CI metadata (workflow names, branch
//! names) routinely violate that, so every tag value is passed through
//! [`sanitize_tag_value`] before it leaves the broker.

use regex::Regex;
use std::sync::LazyLock;

/// Replacement for every disallowed character
pub const TAG_PLACEHOLDER: char = '_';

/// Maximum tag value length, in code points
pub const TAG_VALUE_MAX_CHARS: usize = 256;

/// One code point of the tag character set, by general category
static TAG_CHAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{Z}\p{N}_.:/=+@-]$").expect("tag character class is a valid regex")
});

/// Normalize a value into the tag character set and length
///
/// Works on code points. Input beyond the first 256 code points is dropped.
/// The placeholder is itself allowed, so the function is idempotent.
pub fn sanitize_tag_value(value: &str) -> String {
    value
        .chars()
        .take(TAG_VALUE_MAX_CHARS)
        .map(|c| if is_valid_tag_char(c) { c } else { TAG_PLACEHOLDER })
        .collect()
}

/// Whether a single code point may appear in a tag value
///
/// Letters, separators and numbers are matched by Unicode general category.
/// Combining marks and control characters are not letters or separators,
/// even where `char::is_alphabetic` or `char::is_whitespace` accept them.
pub fn is_valid_tag_char(c: char) -> bool {
    let mut buf = [0u8; 4];
    TAG_CHAR.is_match(c.encode_utf8(&mut buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_and_digits_pass() {
        assert_eq!(
            sanitize_tag_value("abcdefghijklmnopqrstuvwxyz"),
            "abcdefghijklmnopqrstuvwxyz"
        );
        assert_eq!(sanitize_tag_value("0123456789"), "0123456789");
        assert_eq!(sanitize_tag_value("ワークフロー"), "ワークフロー");
    }

    #[test]
    fn test_printable_ascii_punctuation() {
        assert_eq!(
            sanitize_tag_value(" !\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~"),
            " __________+_-./:__=__@__________"
        );
    }

    #[test]
    fn test_emoji_is_one_placeholder() {
        assert_eq!(sanitize_tag_value("😀"), "_");
        assert_eq!(sanitize_tag_value("deploy 🚀 prod"), "deploy _ prod");
    }

    #[test]
    fn test_truncates_on_code_points() {
        assert_eq!(sanitize_tag_value(&"a".repeat(500)), "a".repeat(256));

        // multi-byte characters count once each
        let wide = "é".repeat(300);
        assert_eq!(sanitize_tag_value(&wide).chars().count(), 256);
    }

    #[test]
    fn test_combining_marks_replaced() {
        // spacing and nonspacing marks
        assert_eq!(sanitize_tag_value("\u{093F}"), "_");
        assert_eq!(sanitize_tag_value("कि"), "क_");
        assert_eq!(sanitize_tag_value("\u{0E33}\u{0E48}"), "\u{0E33}_");
        assert_eq!(sanitize_tag_value("e\u{0301}"), "e_");
    }

    #[test]
    fn test_control_whitespace_replaced() {
        assert_eq!(sanitize_tag_value("build\ttest\nx"), "build_test_x");
        assert_eq!(sanitize_tag_value("a\rb\u{000B}c\u{000C}d\u{0085}e"), "a_b_c_d_e");
        // space separators stay
        assert_eq!(sanitize_tag_value("a b\u{00A0}c\u{3000}d"), "a b\u{00A0}c\u{3000}d");
    }

    #[test]
    fn test_non_ascii_letters_and_numbers_pass() {
        assert_eq!(sanitize_tag_value("ñandú-Ωmega"), "ñandú-Ωmega");
        assert_eq!(sanitize_tag_value("٣²Ⅻ"), "٣²Ⅻ");
    }

    #[test]
    fn test_idempotent_on_mixed_input() {
        let once = sanitize_tag_value("feature/#42 (wip) <draft>");
        assert_eq!(once, "feature/_42 _wip_ _draft_");
        assert_eq!(sanitize_tag_value(&once), once);
    }
}
