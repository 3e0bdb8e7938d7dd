//! Backchannel HTTP calls to the identity provider.

use crate::config::{ProviderConfig, TokenAuthMethod};
use crate::errors::{OidcError, Result};
use crate::types::{JwksKeySet, OidcConfiguration, TokenResponse};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{Map, Value};
use std::time::Duration;

/// Outbound calls made during the flow.
///
/// Abstracted so the flow can be driven against a scripted provider in tests.
#[async_trait]
pub trait ProviderHttp: Send + Sync {
    /// GET the discovery document
    async fn fetch_discovery(&self, url: &str) -> Result<OidcConfiguration>;

    /// GET the provider key set
    async fn fetch_jwks(&self, jwks_uri: &str) -> Result<JwksKeySet>;

    /// POST the `authorization_code` grant to the token endpoint
    async fn exchange_code(
        &self,
        config: &ProviderConfig,
        token_endpoint: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse>;

    /// GET the userinfo endpoint with the access token
    async fn fetch_userinfo(
        &self,
        config: &ProviderConfig,
        userinfo_endpoint: &str,
        access_token: &str,
    ) -> Result<Map<String, Value>>;
}

/// [`ProviderHttp`] over a shared `reqwest` client.
///
/// Requests carry a fixed timeout and are never retried.
#[derive(Debug, Clone)]
pub struct ReqwestProviderHttp {
    http_client: Client,
}

impl ReqwestProviderHttp {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OidcError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self { http_client })
    }
}

fn with_provider_headers(mut request: RequestBuilder, config: &ProviderConfig) -> RequestBuilder {
    for (name, value) in &config.extra_headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

async fn read_error_body(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    body.chars().take(512).collect()
}

#[async_trait]
impl ProviderHttp for ReqwestProviderHttp {
    async fn fetch_discovery(&self, url: &str) -> Result<OidcConfiguration> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| OidcError::Discovery(format!("HTTP error: {e}")))?;

        if !response.status().is_success() {
            return Err(OidcError::Discovery(format!(
                "discovery returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OidcError::Discovery(format!("JSON parse error: {e}")))
    }

    async fn fetch_jwks(&self, jwks_uri: &str) -> Result<JwksKeySet> {
        let response = self
            .http_client
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| OidcError::Upstream(format!("Failed to fetch JWKS: {e}")))?;

        if !response.status().is_success() {
            return Err(OidcError::Upstream(format!(
                "JWKS returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OidcError::Upstream(format!("Failed to parse JWKS: {e}")))
    }

    async fn exchange_code(
        &self,
        config: &ProviderConfig,
        token_endpoint: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let mut request = self.http_client.post(token_endpoint);
        match config.token_auth {
            TokenAuthMethod::ClientSecretBasic => {
                request = request.basic_auth(&config.client_id, Some(&config.client_secret));
            }
            TokenAuthMethod::ClientSecretPost => {
                params.push(("client_id", config.client_id.as_str()));
                params.push(("client_secret", config.client_secret.as_str()));
            }
        }

        let response = with_provider_headers(request, config)
            .form(&params)
            .send()
            .await
            .map_err(|e| OidcError::Upstream(format!("Token exchange failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = read_error_body(response).await;
            tracing::warn!(
                provider = %config.provider,
                status = %status,
                body = %body,
                "Token exchange rejected"
            );
            return Err(OidcError::Upstream(format!(
                "Token exchange failed with status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OidcError::Upstream(format!("Failed to parse token response: {e}")))
    }

    async fn fetch_userinfo(
        &self,
        config: &ProviderConfig,
        userinfo_endpoint: &str,
        access_token: &str,
    ) -> Result<Map<String, Value>> {
        let request = self.http_client.get(userinfo_endpoint).bearer_auth(access_token);

        let response = with_provider_headers(request, config)
            .send()
            .await
            .map_err(|e| OidcError::Upstream(format!("User info request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = read_error_body(response).await;
            tracing::warn!(
                provider = %config.provider,
                status = %status,
                body = %body,
                "Userinfo request rejected"
            );
            return Err(OidcError::Upstream(format!(
                "User info request failed with status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OidcError::Upstream(format!("Failed to parse user info: {e}")))
    }
}
