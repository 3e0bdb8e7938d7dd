//! Encrypted cookie transport for identity sessions.

use crate::errors::{Result, SessionError};
use crate::types::IdentitySession;
use chrono::{DateTime, Utc};
use idgate_crypto::SessionCipher;

/// Seals [`IdentitySession`]s into opaque cookie values and opens them again.
///
/// Opening never fails loudly: bad encoding, a failed tag, unparseable JSON
/// and expired or unverified sessions all come back as `None`.
#[derive(Debug, Clone)]
pub struct SessionSealer {
    cipher: SessionCipher,
}

impl SessionSealer {
    /// Rejects secrets shorter than 32 bytes
    pub fn new(secret: &[u8]) -> Result<Self> {
        Ok(Self {
            cipher: SessionCipher::new(secret)?,
        })
    }

    pub fn seal(&self, session: &IdentitySession) -> Result<String> {
        let json =
            serde_json::to_vec(session).map_err(|e| SessionError::Serialization(e.to_string()))?;
        Ok(self.cipher.seal(&json)?)
    }

    pub fn open(&self, sealed: &str) -> Option<IdentitySession> {
        self.open_at(sealed, Utc::now())
    }

    /// Open and re-check expiry against `now`
    pub fn open_at(&self, sealed: &str, now: DateTime<Utc>) -> Option<IdentitySession> {
        let plaintext = match self.cipher.open(sealed) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::debug!(error = %e, "Discarding unreadable session cookie");
                return None;
            }
        };

        let session: IdentitySession = match serde_json::from_slice(&plaintext) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(error = %e, "Discarding malformed session payload");
                return None;
            }
        };

        if !session.is_valid_at(now) {
            tracing::debug!(verified_at = %session.verified_at, "Discarding expired session");
            return None;
        }

        Some(session)
    }
}
