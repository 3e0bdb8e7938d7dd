//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic operation errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Server secret shorter than the required minimum
    #[error("Secret too short: expected at least {min} bytes, got {actual}")]
    SecretTooShort {
        /// Minimum secret size in bytes
        min: usize,
        /// Actual secret size in bytes
        actual: usize,
    },

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (includes authentication tag mismatch)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Sealed payload is not valid base64/hex
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Sealed payload is shorter than IV + tag
    #[error("Sealed data too short")]
    DataTooShort,

    /// Random number generation failed
    #[error("Random number generation failed: {0}")]
    RandomGenerationFailed(String),

    /// HKDF error
    #[error("HKDF error: invalid output length")]
    HkdfError,
}

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;
