//! Shared fixtures for session tests.

use crate::*;
use chrono::{DateTime, Utc};
use idgate_oidc::{NormalizedClaims, Provider};

pub const TEST_SECRET: &[u8] = b"test-session-secret-0123456789abcdef";

pub fn test_claims() -> NormalizedClaims {
    NormalizedClaims {
        subject: "vipps-sub-1".to_string(),
        full_name: Some("Kari Nordmann".to_string()),
        given_name: Some("Kari".to_string()),
        family_name: Some("Nordmann".to_string()),
        phone_number: Some("4791234567".to_string()),
        birth_date: Some("1990-01-01".to_string()),
        national_id: Some("01019012345".to_string()),
    }
}

pub fn test_session(verified_at: DateTime<Utc>) -> IdentitySession {
    IdentitySession::from_claims(Provider::Vipps, &test_claims(), verified_at).unwrap()
}

pub fn test_sealer() -> SessionSealer {
    SessionSealer::new(TEST_SECRET).unwrap()
}
