//! Session token generation

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use rand::{rngs::OsRng, TryRngCore};

use crate::error::SessionError;

/// Draws `length` bytes from the OS CSPRNG and encodes them as URL-safe base64.
///
/// A failing random source is not retried: no token is safer than a
/// predictable one.
pub fn generate_token(length: usize) -> Result<String, SessionError> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| SessionError::RandomSource(e.to_string()))?;
    Ok(URL_SAFE.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length_and_alphabet() {
        let token = generate_token(32).unwrap();
        // 32 bytes -> 44 base64 characters including padding
        assert_eq!(token.len(), 44);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '='));
        assert_eq!(URL_SAFE.decode(&token).unwrap().len(), 32);
    }

    #[test]
    fn test_tokens_differ() {
        let a = generate_token(16).unwrap();
        let b = generate_token(16).unwrap();
        assert_ne!(a, b);
    }
}
