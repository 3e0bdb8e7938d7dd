//! Cryptographic constants and domain separation strings.

/// AES-256 key size in bytes
pub const SESSION_KEY_SIZE: usize = 32;

/// AES-GCM IV size in bytes (96 bits)
pub const IV_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Minimum length of the server-held session secret in bytes
pub const MIN_SECRET_SIZE: usize = 32;

/// Random bytes in an OIDC `state` or `nonce` token (256 bits)
pub const HANDSHAKE_TOKEN_SIZE: usize = 32;

/// Output size of the cookie signing key derivation
pub const COOKIE_SIGNING_KEY_SIZE: usize = 64;

/// Domain separation for the handshake cookie signing key
pub const DOMAIN_COOKIE_SIGNING: &str = "idgate:cookie-signing:v1";
