//! Internal helpers for input normalization and validation.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every service enforces the same field rules.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Trim and collapse inner whitespace. Returns `None` for blank input.
pub(crate) fn normalize_display(input: &str) -> Option<String> {
    let mut out = String::new();
    for token in input.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    if out.is_empty() { None } else { Some(out) }
}

/// Comparison key: accents stripped, lowercase, punctuation folded to single
/// spaces. `"Café  & Bar"` and `"cafe bar"` share the key `"cafe bar"`.
pub(crate) fn normalize_key(input: &str) -> String {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Normalize a required text field and enforce `1..=max_len` characters.
pub(crate) fn required_text(value: &str, label: &str, max_len: usize) -> ResultEngine<String> {
    let normalized = normalize_display(value)
        .ok_or_else(|| EngineError::Validation(format!("{label} must not be empty")))?;
    if normalized.chars().count() > max_len {
        return Err(EngineError::Validation(format!(
            "{label} must be at most {max_len} characters"
        )));
    }
    Ok(normalized)
}

/// Validate a `#RRGGBB` colour and return it uppercased.
pub(crate) fn validate_color(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(EngineError::Validation(format!(
            "invalid color '{trimmed}': expected #RRGGBB"
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::Storage(format!("invalid {label} id: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_collapses_whitespace() {
        assert_eq!(normalize_display("  Eating   out "), Some("Eating out".to_string()));
        assert_eq!(normalize_display("   "), None);
    }

    #[test]
    fn key_folds_accents_case_and_punctuation() {
        assert_eq!(normalize_key("Café  & Bar"), "cafe bar");
        assert_eq!(normalize_key("CAFE-bar!"), "cafe bar");
    }

    #[test]
    fn required_text_enforces_length() {
        assert!(required_text("", "name", 5).is_err());
        assert!(required_text("abcdef", "name", 5).is_err());
        assert_eq!(required_text(" abc ", "name", 5).unwrap(), "abc");
    }

    #[test]
    fn color_must_be_hex_triplet() {
        assert_eq!(validate_color("#ff00aa").unwrap(), "#FF00AA");
        assert!(validate_color("ff00aa").is_err());
        assert!(validate_color("#ff00a").is_err());
        assert!(validate_color("#gg00aa").is_err());
    }
}
