//! AES-256-GCM sealing of cookie payloads.
//!
//! Sealed format, before the outer base64:
//! `hex(IV) || hex(authTag) || hex(ciphertext)` with a 12-byte IV and a
//! 16-byte tag, so the first 56 hex characters are fixed-width.

use crate::{constants::*, derivation::derive_session_key, errors::*, keys::generate_iv};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::prelude::*;

const IV_HEX_LEN: usize = IV_SIZE * 2;
const TAG_HEX_LEN: usize = TAG_SIZE * 2;

/// Symmetric cipher for opaque cookie payloads.
///
/// The key is `SHA-256(secret)`; the secret must be at least
/// [`MIN_SECRET_SIZE`] bytes.
#[derive(Clone)]
pub struct SessionCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCipher").finish_non_exhaustive()
    }
}

impl SessionCipher {
    /// Build a cipher from the server secret.
    pub fn new(secret: &[u8]) -> Result<Self> {
        let key = derive_session_key(secret)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext` under a fresh random IV.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String> {
        let iv = generate_iv()?;
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        // aes-gcm appends the tag; move it in front of the ciphertext
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

        let mut encoded = String::with_capacity(IV_HEX_LEN + TAG_HEX_LEN + ciphertext.len() * 2);
        encoded.push_str(&hex::encode(iv));
        encoded.push_str(&hex::encode(tag));
        encoded.push_str(&hex::encode(ciphertext));

        Ok(BASE64_STANDARD.encode(encoded))
    }

    /// Decrypt a value produced by [`SessionCipher::seal`].
    pub fn open(&self, sealed: &str) -> Result<Vec<u8>> {
        let decoded = BASE64_STANDARD
            .decode(sealed.trim())
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        let decoded =
            String::from_utf8(decoded).map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;

        if decoded.len() < IV_HEX_LEN + TAG_HEX_LEN || !decoded.is_ascii() {
            return Err(CryptoError::DataTooShort);
        }

        let iv = hex::decode(&decoded[..IV_HEX_LEN])
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        let tag = hex::decode(&decoded[IV_HEX_LEN..IV_HEX_LEN + TAG_HEX_LEN])
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        let mut ciphertext = hex::decode(&decoded[IV_HEX_LEN + TAG_HEX_LEN..])
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        ciphertext.extend_from_slice(&tag);

        self.cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}
