use rand::RngCore;
use rand::rngs::OsRng;
use base64::{Engine as _, engine::general_purpose};

/// Entropy of a session token in bytes.
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Generates a new random session token.
///
/// # Returns
///
/// A URL-safe base64-encoded token carrying 256 bits of entropy.
pub fn generate_session_token() -> String {
    let mut token = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut token);

    general_purpose::URL_SAFE_NO_PAD.encode(token)
}

/// A log-safe prefix of a token.
pub fn redact(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn redaction_keeps_a_short_prefix() {
        assert_eq!(redact("abcdefghijklmnop"), "abcdefgh");
        assert_eq!(redact("abc"), "abc");
    }
}
