use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Provider returned no national identity number")]
    MissingNationalId,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Session serialization failed: {0}")]
    Serialization(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] idgate_crypto::CryptoError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
