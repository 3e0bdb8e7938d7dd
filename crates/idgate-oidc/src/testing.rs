//! Scripted provider for tests.
//!
//! Compiled for this crate's unit tests and, behind the `test-util`
//! feature, for dependents' integration tests.

use crate::client::ProviderHttp;
use crate::config::ProviderConfig;
use crate::errors::{OidcError, Result};
use crate::types::{JwksKeySet, OidcConfiguration, TokenResponse};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const ISSUER: &str = "https://idp.test";
pub const CLIENT_ID: &str = "test-client";
pub const KID: &str = "test-key-1";
pub const NATIONAL_ID: &str = "01019012345";

pub fn test_discovery() -> OidcConfiguration {
    OidcConfiguration {
        issuer: ISSUER.into(),
        authorization_endpoint: format!("{ISSUER}/authorize"),
        token_endpoint: format!("{ISSUER}/token"),
        jwks_uri: format!("{ISSUER}/jwks"),
        userinfo_endpoint: Some(format!("{ISSUER}/userinfo")),
        id_token_signing_alg_values_supported: vec!["RS256".into()],
    }
}

pub fn test_jwks() -> JwksKeySet {
    serde_json::from_str(include_str!("../testdata/provider_jwks.json")).unwrap()
}

pub fn sign_with_kid(claims: &Value, kid: &str) -> String {
    let key = EncodingKey::from_rsa_pem(include_bytes!("../testdata/provider_rsa.pem")).unwrap();
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &key).unwrap()
}

pub fn sign(claims: &Value) -> String {
    sign_with_kid(claims, KID)
}

/// Standard claims for `nonce`, valid for five minutes
pub fn id_token_claims(nonce: &str) -> Value {
    let now = idgate_crypto::current_timestamp();
    json!({
        "iss": ISSUER,
        "sub": "subject-1",
        "aud": CLIENT_ID,
        "iat": now,
        "exp": now + 300,
        "nonce": nonce,
        "name": "Kari Nordmann",
        "given_name": "Kari",
        "family_name": "Nordmann",
        "birthdate": "1990-01-01",
        "nin": NATIONAL_ID,
    })
}

/// Scripted identity provider that counts every backchannel call
pub struct MockProviderHttp {
    pub discovery: Mutex<Option<OidcConfiguration>>,
    pub jwks: Mutex<JwksKeySet>,
    pub token: Mutex<Option<TokenResponse>>,
    pub userinfo: Mutex<Option<Map<String, Value>>>,
    pub discovery_calls: AtomicUsize,
    pub jwks_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    pub userinfo_calls: AtomicUsize,
    pub last_redirect_uri: Mutex<Option<String>>,
}

impl MockProviderHttp {
    pub fn new() -> Self {
        Self {
            discovery: Mutex::new(Some(test_discovery())),
            jwks: Mutex::new(test_jwks()),
            token: Mutex::new(None),
            userinfo: Mutex::new(None),
            discovery_calls: AtomicUsize::new(0),
            jwks_calls: AtomicUsize::new(0),
            exchange_calls: AtomicUsize::new(0),
            userinfo_calls: AtomicUsize::new(0),
            last_redirect_uri: Mutex::new(None),
        }
    }

    pub fn with_id_token(self, id_token: String) -> Self {
        self.set_id_token(id_token);
        self
    }

    pub fn with_userinfo(self, userinfo: Value) -> Self {
        self.set_userinfo(userinfo);
        self
    }

    /// Token endpoint answers with `id_token` from now on
    pub fn set_id_token(&self, id_token: String) {
        *self.token.lock().unwrap() = Some(TokenResponse {
            access_token: "access-token".into(),
            id_token: Some(id_token),
            token_type: Some("Bearer".into()),
            expires_in: Some(300),
        });
    }

    pub fn set_userinfo(&self, userinfo: Value) {
        let Value::Object(map) = userinfo else {
            panic!("userinfo must be an object");
        };
        *self.userinfo.lock().unwrap() = Some(map);
    }

    pub fn fail_discovery(&self) {
        *self.discovery.lock().unwrap() = None;
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn exchange_calls(&self) -> usize {
        Self::calls(&self.exchange_calls)
    }

    pub fn total_calls(&self) -> usize {
        Self::calls(&self.discovery_calls)
            + Self::calls(&self.jwks_calls)
            + Self::calls(&self.exchange_calls)
            + Self::calls(&self.userinfo_calls)
    }
}

impl Default for MockProviderHttp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderHttp for MockProviderHttp {
    async fn fetch_discovery(&self, _url: &str) -> Result<OidcConfiguration> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        self.discovery
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| OidcError::Discovery("unreachable".into()))
    }

    async fn fetch_jwks(&self, _jwks_uri: &str) -> Result<JwksKeySet> {
        self.jwks_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.jwks.lock().unwrap().clone())
    }

    async fn exchange_code(
        &self,
        _config: &ProviderConfig,
        _token_endpoint: &str,
        _code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_redirect_uri.lock().unwrap() = Some(redirect_uri.to_string());
        self.token
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| OidcError::Upstream("status 400".into()))
    }

    async fn fetch_userinfo(
        &self,
        _config: &ProviderConfig,
        _userinfo_endpoint: &str,
        _access_token: &str,
    ) -> Result<Map<String, Value>> {
        self.userinfo_calls.fetch_add(1, Ordering::SeqCst);
        self.userinfo
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| OidcError::Upstream("status 401".into()))
    }
}
