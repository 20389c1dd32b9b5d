use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{InterpretError, Result};

const MIN_QUERY_LEN: usize = 3;
const MAX_QUERY_LEN: usize = 1000;

static UNSAFE_PATTERNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<script|javascript:|exec\s*\(|eval\s*\(|__import__").expect("static regex")
});

/// Reject queries that are empty, out of size bounds, or carry injection
/// markers, before any of them reach the model adapter.
pub(crate) fn validate_raw(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InterpretError::InvalidQuery("query is empty".to_owned()));
    }
    if trimmed.len() < MIN_QUERY_LEN {
        return Err(InterpretError::InvalidQuery(format!(
            "query shorter than {MIN_QUERY_LEN} characters"
        )));
    }
    if trimmed.len() > MAX_QUERY_LEN {
        return Err(InterpretError::InvalidQuery(format!(
            "query longer than {MAX_QUERY_LEN} characters"
        )));
    }
    if UNSAFE_PATTERNS.is_match(trimmed) {
        return Err(InterpretError::InvalidQuery(
            "query contains unsafe content".to_owned(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_enforced() {
        assert!(validate_raw("   ").is_err());
        assert!(validate_raw("hi").is_err());
        assert!(validate_raw(&"x".repeat(1001)).is_err());
        assert_eq!(validate_raw(" were tests flaky? ").unwrap(), "were tests flaky?");
    }

    #[test]
    fn injection_markers_are_rejected() {
        assert!(validate_raw("<script>alert(1)</script>").is_err());
        assert!(validate_raw("show me eval( output").is_err());
        assert!(validate_raw("how many evaluations ran?").is_ok());
    }
}
