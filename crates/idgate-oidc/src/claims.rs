//! Normalization of provider claims into one identity shape.

use crate::config::ClaimsSource;
use crate::errors::{OidcError, Result};
use crate::types::IdTokenClaims;
use idgate_crypto::constant_time_compare;
use serde_json::{Map, Value};

const SUBJECT_CLAIMS: &[&str] = &["sub", "uuid"];
const NATIONAL_ID_CLAIMS: &[&str] = &["nin", "nnin", "ssn", "socialno", "national_identity_number"];
const BIRTH_DATE_CLAIMS: &[&str] = &["birthdate", "birth_date", "dateofbirth"];
const PHONE_CLAIMS: &[&str] = &["phone_number", "phone"];

/// Identity attributes common to every provider
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NormalizedClaims {
    pub subject: String,
    pub full_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub phone_number: Option<String>,
    pub birth_date: Option<String>,
    /// Raw national identity number; hash before storing
    pub national_id: Option<String>,
}

impl std::fmt::Debug for NormalizedClaims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedClaims")
            .field("subject", &self.subject)
            .field("full_name", &self.full_name)
            .field("has_national_id", &self.national_id.is_some())
            .finish_non_exhaustive()
    }
}

fn first_string(claims: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match claims.get(*name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl NormalizedClaims {
    /// Map a raw claim object onto the normalized shape
    pub fn from_claim_map(claims: &Map<String, Value>) -> Result<Self> {
        let subject = first_string(claims, SUBJECT_CLAIMS)
            .ok_or_else(|| OidcError::InvalidClaims("no subject claim".into()))?;

        let given_name = first_string(claims, &["given_name"]);
        let family_name = first_string(claims, &["family_name"]);
        let full_name = first_string(claims, &["name"]).or_else(|| {
            match (&given_name, &family_name) {
                (Some(given), Some(family)) => Some(format!("{given} {family}")),
                (Some(given), None) => Some(given.clone()),
                (None, Some(family)) => Some(family.clone()),
                (None, None) => None,
            }
        });

        Ok(Self {
            subject,
            full_name,
            given_name,
            family_name,
            phone_number: first_string(claims, PHONE_CLAIMS),
            birth_date: first_string(claims, BIRTH_DATE_CLAIMS),
            national_id: first_string(claims, NATIONAL_ID_CLAIMS),
        })
    }
}

/// Pick the claim source for a completed exchange.
///
/// Without an ID token the userinfo response is the only source. When both
/// are present their subjects must agree.
pub fn resolve_claims(
    source: ClaimsSource,
    id_token: Option<&IdTokenClaims>,
    userinfo: Option<&Map<String, Value>>,
) -> Result<NormalizedClaims> {
    let from_id_token = id_token.map(|c| NormalizedClaims::from_claim_map(&c.to_claim_map()));

    let from_userinfo = userinfo.map(NormalizedClaims::from_claim_map).transpose()?;

    if let (Some(id_claims), Some(info)) = (id_token, from_userinfo.as_ref()) {
        if !constant_time_compare(id_claims.sub.as_bytes(), info.subject.as_bytes()) {
            return Err(OidcError::SubjectMismatch);
        }
    }

    match (source, from_id_token, from_userinfo) {
        (ClaimsSource::Userinfo, _, Some(info)) => Ok(info),
        (ClaimsSource::IdToken, Some(id_claims), _) => id_claims,
        (_, None, Some(info)) => Ok(info),
        (ClaimsSource::Userinfo, Some(_), None) => Err(OidcError::InvalidClaims(
            "userinfo required for this provider".into(),
        )),
        (_, None, None) => Err(OidcError::InvalidClaims(
            "neither ID token nor userinfo available".into(),
        )),
    }
}
