//! OIDC flow error types.

use thiserror::Error;

/// Errors raised while running the authorization-code flow
#[derive(Debug, Error)]
pub enum OidcError {
    /// Required provider settings are missing or malformed
    #[error("Provider configuration invalid: {0}")]
    Configuration(String),

    /// Discovery document could not be fetched or is incomplete
    #[error("OIDC discovery failed: {0}")]
    Discovery(String),

    /// Callback arrived without an authorization code
    #[error("Authorization code missing from callback")]
    MissingCode,

    /// Returned `state` does not match the handshake cookie
    #[error("State mismatch")]
    StateMismatch,

    /// ID token `nonce` does not match the handshake cookie
    #[error("Nonce mismatch")]
    NonceMismatch,

    /// Provider unreachable or answered with a non-success status
    #[error("Upstream provider error: {0}")]
    Upstream(String),

    /// ID token failed signature or claim validation
    #[error("Invalid ID token: {0}")]
    InvalidIdToken(String),

    /// Signing key not present in the provider JWKS
    #[error("Signing key not found: {kid}")]
    KeyNotFound { kid: String },

    /// Subject in userinfo differs from the ID token subject
    #[error("Subject mismatch between ID token and userinfo")]
    SubjectMismatch,

    /// Claims lack a required attribute
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    /// Crypto error
    #[error("Crypto error: {0}")]
    Crypto(#[from] idgate_crypto::CryptoError),
}

/// Reason code carried in the error redirect (`/{flow}?error=<reason>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    NoCode,
    Config,
    Discovery,
    AuthFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::NoCode => "no_code",
            FailureReason::Config => "config",
            FailureReason::Discovery => "discovery",
            FailureReason::AuthFailed => "auth_failed",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OidcError {
    /// Browser-facing reason for this error
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            OidcError::MissingCode => FailureReason::NoCode,
            OidcError::Configuration(_) => FailureReason::Config,
            OidcError::Discovery(_) => FailureReason::Discovery,
            _ => FailureReason::AuthFailed,
        }
    }

    /// Whether this error indicates forged or replayed callback input
    pub fn is_security_event(&self) -> bool {
        matches!(self, OidcError::StateMismatch | OidcError::NonceMismatch)
    }
}

/// Result type for OIDC operations
pub type Result<T> = std::result::Result<T, OidcError>;
