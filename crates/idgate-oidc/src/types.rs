//! OIDC wire types: discovery document, JWKS, token response, ID token claims.

use crate::errors::{OidcError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Provider metadata from `/.well-known/openid-configuration`
///
/// Required fields default to empty so an incomplete document can be
/// rejected by [`OidcConfiguration::validate`] instead of a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcConfiguration {
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub authorization_endpoint: String,
    #[serde(default)]
    pub token_endpoint: String,
    #[serde(default)]
    pub jwks_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

impl OidcConfiguration {
    /// Reject documents missing any endpoint the flow depends on
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("issuer", &self.issuer),
            ("authorization_endpoint", &self.authorization_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("jwks_uri", &self.jwks_uri),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(OidcError::Discovery(format!(
                "discovery document missing {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

/// JSON Web Key Set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksKeySet {
    pub keys: Vec<JwksKey>,
}

impl JwksKeySet {
    /// Find key by Key ID (kid)
    pub fn find_key(&self, kid: &str) -> Option<&JwksKey> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}

/// RSA JSON Web Key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksKey {
    pub kty: String,
    pub kid: Option<String>,
    #[serde(rename = "use")]
    pub use_: Option<String>,
    pub alg: Option<String>,
    /// RSA modulus (base64url)
    #[serde(default)]
    pub n: String,
    /// RSA public exponent (base64url)
    #[serde(default)]
    pub e: String,
}

/// Token endpoint response
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Validated ID token payload.
///
/// Registered claims are typed; everything else (profile and national-id
/// claims, `aud`) is kept in `extra` for normalization.
#[derive(Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdTokenClaims {
    /// All claims as one JSON object
    pub fn to_claim_map(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        map.insert("iss".into(), Value::String(self.iss.clone()));
        map.insert("sub".into(), Value::String(self.sub.clone()));
        map
    }
}

impl std::fmt::Debug for IdTokenClaims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdTokenClaims")
            .field("iss", &self.iss)
            .field("sub", &self.sub)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("extra_claims", &self.extra.len())
            .finish()
    }
}

/// Cached value with a fetch time and TTL
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: u64,
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    pub fn is_valid(&self, current_time: u64) -> bool {
        current_time < self.fetched_at.saturating_add(self.ttl)
    }
}
