//! Key derivation from the server-held session secret.

use crate::{constants::*, errors::*};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Reject secrets shorter than [`MIN_SECRET_SIZE`].
pub fn ensure_secret_length(secret: &[u8]) -> Result<()> {
    if secret.len() < MIN_SECRET_SIZE {
        return Err(CryptoError::SecretTooShort {
            min: MIN_SECRET_SIZE,
            actual: secret.len(),
        });
    }
    Ok(())
}

/// Derive the AES-256 session key as `SHA-256(secret)`.
pub fn derive_session_key(secret: &[u8]) -> Result<Zeroizing<[u8; SESSION_KEY_SIZE]>> {
    ensure_secret_length(secret)?;
    let digest = Sha256::digest(secret);
    let mut key = Zeroizing::new([0u8; SESSION_KEY_SIZE]);
    key.copy_from_slice(&digest);
    Ok(key)
}

/// Derive the 64-byte key that signs the handshake cookies.
///
/// Formula: `HKDF-SHA256(secret, info = "idgate:cookie-signing:v1")`
pub fn derive_cookie_signing_key(
    secret: &[u8],
) -> Result<Zeroizing<[u8; COOKIE_SIGNING_KEY_SIZE]>> {
    ensure_secret_length(secret)?;
    let hkdf = Hkdf::<Sha256>::new(None, secret);
    let mut okm = Zeroizing::new([0u8; COOKIE_SIGNING_KEY_SIZE]);
    hkdf.expand(DOMAIN_COOKIE_SIGNING.as_bytes(), okm.as_mut())
        .map_err(|_| CryptoError::HkdfError)?;
    Ok(okm)
}
