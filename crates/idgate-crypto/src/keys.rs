//! Random token and IV generation.

use crate::{constants::*, errors::*};
use base64::prelude::*;
use rand::RngCore;

/// Fill a fixed-size array from the thread-local CSPRNG.
pub fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    rand::thread_rng()
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::RandomGenerationFailed(e.to_string()))?;
    Ok(bytes)
}

/// Generate a random 96-bit AES-GCM IV
pub fn generate_iv() -> Result<[u8; IV_SIZE]> {
    random_bytes::<IV_SIZE>()
}

/// Generate a URL-safe random token with 256 bits of entropy.
///
/// Used for the OIDC `state` and `nonce` parameters. Produces 43 base64url
/// characters without padding.
pub fn generate_handshake_token() -> Result<String> {
    let bytes = random_bytes::<HANDSHAKE_TOKEN_SIZE>()?;
    Ok(BASE64_URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_token_length() {
        let token = generate_handshake_token().unwrap();
        assert_eq!(token.len(), 43);
    }

    #[test]
    fn test_handshake_token_is_unique() {
        let t1 = generate_handshake_token().unwrap();
        let t2 = generate_handshake_token().unwrap();
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_handshake_token_is_url_safe() {
        let token = generate_handshake_token().unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_generate_iv_is_random() {
        let iv1 = generate_iv().unwrap();
        let iv2 = generate_iv().unwrap();
        assert_ne!(iv1, iv2);
    }
}
