//! String utility functions

/// Truncate an identifier to at most `max_chars` characters (char-boundary safe)
pub fn truncate_id(id: &str, max_chars: usize) -> &str {
    match id.char_indices().nth(max_chars) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Trim a string and drop it if nothing is left
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Case-insensitive substring check
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_id() {
        assert_eq!(truncate_id("0123456789abcdef", 8), "01234567");
        assert_eq!(truncate_id("abc", 8), "abc");
        assert_eq!(truncate_id("", 8), "");
        assert_eq!(truncate_id("héllo wörld", 4), "héll");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  t1 ".into())), Some("t1".into()));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("SessionStart", "start"));
        assert!(!contains_ignore_case("llm_call", "start"));
    }
}
