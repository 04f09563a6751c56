// src/utils.rs
// Shared utility functions used across the codebase

/// Truncate a string to at most `max_chars` characters with an ellipsis.
///
/// Cuts on a character boundary, so multi-byte text never panics.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Seconds with one decimal, for progress messages
pub fn format_secs(elapsed: std::time::Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_exact_length() {
        assert_eq!(truncate("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("hello world", 5), "hello...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("héllo wörld", 4), "héll...");
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(Duration::from_millis(1300)), "1.3s");
        assert_eq!(format_secs(Duration::from_secs(3)), "3.0s");
    }
}
