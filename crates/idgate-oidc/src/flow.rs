//! Authorization-code flow orchestration.

use crate::authorize::build_authorization_url;
use crate::claims::{resolve_claims, NormalizedClaims};
use crate::client::ProviderHttp;
use crate::config::{ClaimsSource, ProviderConfig};
use crate::discovery::DiscoveryCache;
use crate::errors::{OidcError, Result};
use crate::types::OidcConfiguration;
use crate::validation::validate_id_token;
use idgate_crypto::{constant_time_compare, generate_handshake_token, hash_for_log};
use std::sync::Arc;

/// Result of starting a flow: where to send the browser and what to remember
#[derive(Clone)]
pub struct AuthorizationStart {
    pub authorization_url: String,
    pub state: String,
    pub nonce: String,
}

impl std::fmt::Debug for AuthorizationStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationStart")
            .field("state", &hash_for_log(&self.state))
            .finish_non_exhaustive()
    }
}

/// Query parameters of the provider callback
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackParams<'a> {
    pub code: Option<&'a str>,
    pub state: Option<&'a str>,
}

/// Values remembered from initiation (handshake cookies)
#[derive(Debug, Clone, Copy)]
pub struct ExpectedHandshake<'a> {
    pub state: Option<&'a str>,
    pub nonce: Option<&'a str>,
    pub redirect_uri: &'a str,
}

/// Runs the flow against any [`ProviderHttp`] using a shared [`DiscoveryCache`]
#[derive(Clone)]
pub struct OidcClient {
    http: Arc<dyn ProviderHttp>,
    discovery: Arc<DiscoveryCache>,
}

impl OidcClient {
    pub fn new(http: Arc<dyn ProviderHttp>, discovery: Arc<DiscoveryCache>) -> Self {
        Self { http, discovery }
    }

    pub fn discovery_cache(&self) -> &DiscoveryCache {
        &self.discovery
    }

    async fn discover(&self, config: &ProviderConfig, now: u64) -> Result<OidcConfiguration> {
        self.discovery
            .configuration(self.http.as_ref(), &config.discovery_url, now)
            .await
    }

    /// Generate `state` and `nonce` and build the authorization URL
    pub async fn begin(
        &self,
        config: &ProviderConfig,
        redirect_uri: &str,
        now: u64,
    ) -> Result<AuthorizationStart> {
        let discovery = self.discover(config, now).await?;

        let state = generate_handshake_token()?;
        let nonce = generate_handshake_token()?;
        let authorization_url =
            build_authorization_url(config, &discovery, redirect_uri, &state, &nonce)?;

        tracing::debug!(
            provider = %config.provider,
            state_hash = %hash_for_log(&state),
            "Authorization request built"
        );

        Ok(AuthorizationStart {
            authorization_url,
            state,
            nonce,
        })
    }

    /// Validate a callback and resolve the provider's identity claims.
    ///
    /// `code` and `state` are checked before any network call.
    pub async fn complete(
        &self,
        config: &ProviderConfig,
        params: CallbackParams<'_>,
        expected: ExpectedHandshake<'_>,
        now: u64,
    ) -> Result<NormalizedClaims> {
        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or(OidcError::MissingCode)?;

        match (params.state, expected.state) {
            (Some(returned), Some(stored))
                if constant_time_compare(returned.as_bytes(), stored.as_bytes()) => {}
            _ => return Err(OidcError::StateMismatch),
        }

        let discovery = self.discover(config, now).await?;

        let tokens = self
            .http
            .exchange_code(config, &discovery.token_endpoint, code, expected.redirect_uri)
            .await?;

        let id_claims = match tokens.id_token.as_deref() {
            Some(id_token) => Some(
                self.verify_id_token(config, &discovery, id_token, expected.nonce, now)
                    .await?,
            ),
            None => None,
        };

        let needs_userinfo =
            id_claims.is_none() || config.claims_source == ClaimsSource::Userinfo;

        let userinfo = if needs_userinfo {
            let endpoint = discovery.userinfo_endpoint.as_deref().ok_or_else(|| {
                OidcError::Upstream("provider has no userinfo endpoint".into())
            })?;
            if tokens.access_token.is_empty() {
                return Err(OidcError::Upstream("token response has no access token".into()));
            }
            Some(
                self.http
                    .fetch_userinfo(config, endpoint, &tokens.access_token)
                    .await?,
            )
        } else {
            None
        };

        let claims = resolve_claims(config.claims_source, id_claims.as_ref(), userinfo.as_ref())?;

        tracing::info!(
            provider = %config.provider,
            id_token = id_claims.is_some(),
            userinfo = userinfo.is_some(),
            "Provider callback validated"
        );

        Ok(claims)
    }

    async fn verify_id_token(
        &self,
        config: &ProviderConfig,
        discovery: &OidcConfiguration,
        id_token: &str,
        expected_nonce: Option<&str>,
        now: u64,
    ) -> Result<crate::types::IdTokenClaims> {
        let jwks = self
            .discovery
            .key_set(self.http.as_ref(), &discovery.jwks_uri, now)
            .await?;

        match validate_id_token(
            id_token,
            &jwks,
            &discovery.issuer,
            &config.client_id,
            expected_nonce,
        ) {
            Err(OidcError::KeyNotFound { kid }) => {
                tracing::info!(provider = %config.provider, kid = %kid, "Unknown signing key, refreshing JWKS");
                let jwks = self
                    .discovery
                    .refresh_key_set(self.http.as_ref(), &discovery.jwks_uri, now)
                    .await?;
                validate_id_token(
                    id_token,
                    &jwks,
                    &discovery.issuer,
                    &config.client_id,
                    expected_nonce,
                )
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Provider, ProviderSettings};
    use crate::testing::*;
    use serde_json::json;
    use url::Url;

    const REDIRECT: &str = "https://app.example.no/api/auth/criipto/callback";

    fn criipto_config() -> ProviderConfig {
        ProviderConfig::from_settings(
            Provider::Criipto,
            &ProviderSettings {
                client_id: Some(CLIENT_ID.into()),
                client_secret: Some("secret".into()),
                domain: Some("idp.test".into()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn vipps_config() -> ProviderConfig {
        ProviderConfig::from_settings(
            Provider::Vipps,
            &ProviderSettings {
                client_id: Some(CLIENT_ID.into()),
                client_secret: Some("secret".into()),
                subscription_key: Some("sub".into()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn client(http: Arc<MockProviderHttp>) -> OidcClient {
        OidcClient::new(http, Arc::new(DiscoveryCache::default()))
    }

    fn expected<'a>(state: &'a str, nonce: &'a str) -> ExpectedHandshake<'a> {
        ExpectedHandshake {
            state: Some(state),
            nonce: Some(nonce),
            redirect_uri: REDIRECT,
        }
    }

    #[tokio::test]
    async fn test_begin_builds_url_with_fresh_tokens() {
        let http = Arc::new(MockProviderHttp::new());
        let oidc = client(http.clone());
        let now = idgate_crypto::current_timestamp();

        let start = oidc.begin(&criipto_config(), REDIRECT, now).await.unwrap();
        let url = Url::parse(&start.authorization_url).unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(query.contains(&("state".into(), start.state.clone())));
        assert!(query.contains(&("nonce".into(), start.nonce.clone())));
        assert_ne!(start.state, start.nonce);
        assert_eq!(start.state.len(), 43);
    }

    #[tokio::test]
    async fn test_complete_with_id_token() {
        let http = Arc::new(
            MockProviderHttp::new().with_id_token(sign(&id_token_claims("nonce-1"))),
        );
        let oidc = client(http.clone());
        let now = idgate_crypto::current_timestamp();

        let claims = oidc
            .complete(
                &criipto_config(),
                CallbackParams {
                    code: Some("code-1"),
                    state: Some("state-1"),
                },
                expected("state-1", "nonce-1"),
                now,
            )
            .await
            .unwrap();

        assert_eq!(claims.subject, "subject-1");
        assert_eq!(claims.national_id.as_deref(), Some("01019012345"));
        assert_eq!(MockProviderHttp::calls(&http.exchange_calls), 1);
        assert_eq!(MockProviderHttp::calls(&http.userinfo_calls), 0);
        assert_eq!(
            http.last_redirect_uri.lock().unwrap().as_deref(),
            Some(REDIRECT)
        );
    }

    #[tokio::test]
    async fn test_state_mismatch_makes_no_network_call() {
        let http = Arc::new(MockProviderHttp::new());
        let oidc = client(http.clone());

        let err = oidc
            .complete(
                &criipto_config(),
                CallbackParams {
                    code: Some("code-1"),
                    state: Some("xyz"),
                },
                expected("state-1", "nonce-1"),
                1000,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OidcError::StateMismatch));
        assert!(err.is_security_event());
        assert_eq!(MockProviderHttp::calls(&http.discovery_calls), 0);
        assert_eq!(MockProviderHttp::calls(&http.exchange_calls), 0);
    }

    #[tokio::test]
    async fn test_missing_state_cookie_is_mismatch() {
        let http = Arc::new(MockProviderHttp::new());
        let oidc = client(http.clone());

        let err = oidc
            .complete(
                &criipto_config(),
                CallbackParams {
                    code: Some("code-1"),
                    state: Some("state-1"),
                },
                ExpectedHandshake {
                    state: None,
                    nonce: Some("nonce-1"),
                    redirect_uri: REDIRECT,
                },
                1000,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OidcError::StateMismatch));
        assert_eq!(MockProviderHttp::calls(&http.exchange_calls), 0);
    }

    #[tokio::test]
    async fn test_missing_code() {
        let http = Arc::new(MockProviderHttp::new());
        let oidc = client(http.clone());

        let err = oidc
            .complete(
                &criipto_config(),
                CallbackParams {
                    code: None,
                    state: Some("state-1"),
                },
                expected("state-1", "nonce-1"),
                1000,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OidcError::MissingCode));
        assert_eq!(MockProviderHttp::calls(&http.exchange_calls), 0);
    }

    #[tokio::test]
    async fn test_nonce_replay_rejected() {
        let http = Arc::new(
            MockProviderHttp::new().with_id_token(sign(&id_token_claims("old-nonce"))),
        );
        let oidc = client(http.clone());
        let now = idgate_crypto::current_timestamp();

        let err = oidc
            .complete(
                &criipto_config(),
                CallbackParams {
                    code: Some("code-1"),
                    state: Some("state-1"),
                },
                expected("state-1", "nonce-1"),
                now,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OidcError::NonceMismatch));
    }

    #[tokio::test]
    async fn test_vipps_reads_userinfo() {
        let http = Arc::new(
            MockProviderHttp::new()
                .with_id_token(sign(&id_token_claims("nonce-1")))
                .with_userinfo(json!({
                    "sub": "subject-1",
                    "name": "Ola Nordmann",
                    "nin": "02029012345"
                })),
        );
        let oidc = client(http.clone());
        let now = idgate_crypto::current_timestamp();

        let claims = oidc
            .complete(
                &vipps_config(),
                CallbackParams {
                    code: Some("code-1"),
                    state: Some("state-1"),
                },
                expected("state-1", "nonce-1"),
                now,
            )
            .await
            .unwrap();

        assert_eq!(claims.full_name.as_deref(), Some("Ola Nordmann"));
        assert_eq!(claims.national_id.as_deref(), Some("02029012345"));
        assert_eq!(MockProviderHttp::calls(&http.userinfo_calls), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let http = Arc::new(MockProviderHttp::new());
        let oidc = client(http.clone());

        let err = oidc
            .complete(
                &criipto_config(),
                CallbackParams {
                    code: Some("code-1"),
                    state: Some("state-1"),
                },
                expected("state-1", "nonce-1"),
                1000,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OidcError::Upstream(_)));
        assert_eq!(MockProviderHttp::calls(&http.exchange_calls), 1);
    }

    #[tokio::test]
    async fn test_unknown_kid_refreshes_jwks_once() {
        let http = Arc::new(MockProviderHttp::new().with_id_token(sign_with_kid(
            &id_token_claims("nonce-1"),
            "rotated-key",
        )));
        let oidc = client(http.clone());
        let now = idgate_crypto::current_timestamp();

        let err = oidc
            .complete(
                &criipto_config(),
                CallbackParams {
                    code: Some("code-1"),
                    state: Some("state-1"),
                },
                expected("state-1", "nonce-1"),
                now,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OidcError::KeyNotFound { .. }));
        assert_eq!(MockProviderHttp::calls(&http.jwks_calls), 2);
    }

    #[tokio::test]
    async fn test_rotated_key_accepted_after_refresh() {
        let http = Arc::new(MockProviderHttp::new().with_id_token(sign_with_kid(
            &id_token_claims("nonce-1"),
            "rotated-key",
        )));
        let oidc = client(http.clone());
        let now = idgate_crypto::current_timestamp();

        // Prime the cache with the pre-rotation key set
        oidc.discovery_cache()
            .key_set(http.as_ref(), "https://idp.test/jwks", now)
            .await
            .unwrap();

        // Provider publishes the rotated key
        {
            let mut jwks = http.jwks.lock().unwrap();
            let mut rotated = jwks.keys[0].clone();
            rotated.kid = Some("rotated-key".into());
            jwks.keys.push(rotated);
        }

        let claims = oidc
            .complete(
                &criipto_config(),
                CallbackParams {
                    code: Some("code-1"),
                    state: Some("state-1"),
                },
                expected("state-1", "nonce-1"),
                now,
            )
            .await
            .unwrap();

        assert_eq!(claims.subject, "subject-1");
        assert_eq!(MockProviderHttp::calls(&http.jwks_calls), 2);
    }
}
