//! Shared helpers for provider adapters

/// Minimum key length to display partial key
const MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY: usize = 8;

/// Number of characters to show at start/end of masked key
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Longest backend message kept in an error
const MAX_ERROR_MESSAGE_LEN: usize = 300;

/// Sensitive patterns to filter from error messages
const SENSITIVE_PATTERNS: &[&str] = &[
    "api_key",
    "api-key",
    "apikey",
    "x-goog-api-key",
    "authorization",
    "bearer",
    "secret",
    "password",
    "credential",
];

/// Mask API key for safe display in logs
///
/// # Examples
/// ```
/// use vitae_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-1...cdef");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY || !key.is_ascii() {
        return "****".to_string();
    }
    format!(
        "{}...{}",
        &key[..KEY_MASK_VISIBLE_CHARS],
        &key[key.len() - KEY_MASK_VISIBLE_CHARS..]
    )
}

/// Sanitize a backend error message before it is stored in an [`Error`](crate::Error)
///
/// Messages mentioning credentials are replaced wholesale. Long bodies are
/// truncated.
///
/// # Examples
/// ```
/// use vitae_llm::util::sanitize_api_error;
/// assert_eq!(sanitize_api_error("Invalid api_key provided"), "authentication error");
/// assert_eq!(sanitize_api_error("model overloaded"), "model overloaded");
/// ```
#[must_use]
pub fn sanitize_api_error(message: &str) -> String {
    let lower = message.to_lowercase();
    if SENSITIVE_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        return "authentication error".to_string();
    }

    let trimmed = message.trim();
    if trimmed.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let cut: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        return format!("{cut}...");
    }
    trimmed.to_string()
}

/// Pull a human-readable message out of a JSON error body
///
/// Understands `{"error": {"message": ..}}`, `{"error": ".."}` and
/// `{"message": ..}`. Falls back to the raw body.
#[must_use]
pub fn extract_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };

    value
        .pointer("/error/message")
        .or_else(|| value.get("error"))
        .or_else(|| value.get("message"))
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| body.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key_long() {
        let masked = mask_api_key("sk-1234567890abcdefghij");
        assert_eq!(masked, "sk-1...ghij");
        assert!(!masked.contains("567890"));
    }

    #[test]
    fn test_mask_api_key_short() {
        assert_eq!(mask_api_key("short"), "****");
        assert_eq!(mask_api_key("12345678"), "****");
        assert_eq!(mask_api_key(""), "****");
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let long = "x".repeat(1000);
        let sanitized = sanitize_api_error(&long);
        assert!(sanitized.ends_with("..."));
        assert_eq!(sanitized.len(), MAX_ERROR_MESSAGE_LEN + 3);
    }

    #[test]
    fn test_sanitize_hides_auth_details() {
        assert_eq!(
            sanitize_api_error("Invalid Authorization: Bearer sk-abc"),
            "authentication error"
        );
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#),
            "Overloaded"
        );
        assert_eq!(extract_error_message(r#"{"message":"bad model"}"#), "bad model");
        assert_eq!(extract_error_message("<html>502</html>"), "<html>502</html>");
    }
}
