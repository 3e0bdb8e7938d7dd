//! # idgate-crypto
//!
//! Cryptographic primitives for the idgate identity verification service.
//!
//! - AES-256-GCM sealing of session payloads for cookie transport
//! - SHA-256 hashing of national identity numbers (the raw value is never kept)
//! - Random `state`/`nonce` tokens for the OIDC handshake
//! - HKDF derivation of the cookie signing key

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod derivation;
pub mod encryption;
pub mod errors;
pub mod hashing;
pub mod keys;
pub mod utils;

pub use constants::*;
pub use derivation::*;
pub use encryption::SessionCipher;
pub use errors::{CryptoError, Result};
pub use hashing::*;
pub use keys::*;
pub use utils::current_timestamp;
