use base64::Engine;
use thiserror::Error;

/// Number of random bytes in a session token. Encoded as base64url this
/// yields a 43-character string.
pub const TOKEN_BYTES: usize = 32;

/// How long an issued token stays valid, measured from `token_created`.
pub const TOKEN_LIFESPAN_HOURS: i64 = 24;

#[must_use]
pub fn token_lifespan() -> chrono::Duration {
    chrono::Duration::hours(TOKEN_LIFESPAN_HOURS)
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// The OS randomness source failed. Fatal for the request: a token must
    /// never be produced from a non-cryptographic generator.
    #[error("system randomness source unavailable: {0}")]
    Rng(String),
}

/// Generate `len` cryptographically random bytes and encode them as a
/// URL-safe, unpadded base64 string.
pub fn generate_token(len: usize) -> Result<String, TokenError> {
    use rand::TryRngCore;

    let mut buf = vec![0u8; len];
    rand::rngs::OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| TokenError::Rng(e.to_string()))?;

    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Render the `Authorization` header value carrying a session token.
#[must_use]
pub fn format_auth_header(token: &str) -> String {
    format!("token token={token}")
}

/// Parse a presented `Authorization` header of the form
/// `token token=<value>`. Returns `None` for any other shape, including the
/// `Basic` scheme used by the authentication endpoint.
#[must_use]
pub fn parse_auth_header(value: &str) -> Option<&str> {
    let rest = value.strip_prefix("token")?.trim_start();
    let token = rest.strip_prefix("token=")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_has_expected_length_and_alphabet() {
        let token = generate_token(TOKEN_BYTES).unwrap();
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn tokens_are_unique() {
        let a = generate_token(TOKEN_BYTES).unwrap();
        let b = generate_token(TOKEN_BYTES).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn header_round_trips() {
        let token = generate_token(TOKEN_BYTES).unwrap();
        let header = format_auth_header(&token);
        assert_eq!(parse_auth_header(&header), Some(token.as_str()));
    }

    #[test]
    fn header_parsing_rejects_other_shapes() {
        assert_eq!(parse_auth_header("Basic dXNlcjpwYXNz"), None);
        assert_eq!(parse_auth_header("Bearer abc"), None);
        assert_eq!(parse_auth_header("token token="), None);
        assert_eq!(parse_auth_header(""), None);
    }
}
