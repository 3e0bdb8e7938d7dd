use crate::constants::*;
use crate::errors::{Result, SessionError};
use chrono::{DateTime, Duration, Utc};
use idgate_crypto::hash_national_id;
use idgate_oidc::{NormalizedClaims, Provider};
use serde::{Deserialize, Serialize};

/// A real-world identity verified by an eID provider.
///
/// Carried in the encrypted `identity_session` cookie and never mutated.
/// Only the SHA-256 of the national identity number is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySession {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    pub national_id_hash: String,
    pub provider_user_id: String,
    pub provider: Provider,
    pub verified_at: DateTime<Utc>,
}

impl IdentitySession {
    /// Build a verified session from normalized provider claims.
    ///
    /// The national identity number is hashed here and goes no further.
    pub fn from_claims(
        provider: Provider,
        claims: &NormalizedClaims,
        verified_at: DateTime<Utc>,
    ) -> Result<Self> {
        let national_id = claims
            .national_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(SessionError::MissingNationalId)?;

        Ok(Self {
            verified: true,
            full_name: claims.full_name.clone(),
            given_name: claims.given_name.clone(),
            family_name: claims.family_name.clone(),
            phone_number: claims.phone_number.clone(),
            birth_date: claims.birth_date.clone(),
            national_id_hash: hash_national_id(national_id),
            provider_user_id: claims.subject.clone(),
            provider,
            verified_at,
        })
    }

    /// Whether the session may be trusted at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.verified {
            return false;
        }
        if self.verified_at > now + Duration::seconds(VERIFIED_AT_FUTURE_SKEW_SECS) {
            return false;
        }
        now - self.verified_at <= Duration::seconds(IDENTITY_SESSION_MAX_AGE_SECS)
    }

    /// Seconds until the session lapses, for the cookie `Max-Age`
    pub fn remaining_lifetime(&self, now: DateTime<Utc>) -> i64 {
        let expires_at = self.verified_at + Duration::seconds(IDENTITY_SESSION_MAX_AGE_SECS);
        (expires_at - now).num_seconds().max(0)
    }
}

/// Public view of the current identity session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
}

impl SessionSummary {
    pub fn unverified() -> Self {
        Self {
            verified: false,
            full_name: None,
            given_name: None,
            family_name: None,
            verified_at: None,
            provider: None,
        }
    }
}

impl From<Option<&IdentitySession>> for SessionSummary {
    fn from(session: Option<&IdentitySession>) -> Self {
        match session {
            Some(s) => Self {
                verified: s.verified,
                full_name: s.full_name.clone(),
                given_name: s.given_name.clone(),
                family_name: s.family_name.clone(),
                verified_at: Some(s.verified_at),
                provider: Some(s.provider),
            },
            None => Self::unverified(),
        }
    }
}
