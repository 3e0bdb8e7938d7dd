//! Identity provider configuration.

use crate::errors::{OidcError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Vipps Login production discovery document
pub const VIPPS_DISCOVERY_URL: &str =
    "https://api.vipps.no/access-management-1.0/access/.well-known/openid-configuration";

const VIPPS_DEFAULT_SCOPES: &str = "openid name phoneNumber birthDate nin";
const CRIIPTO_DEFAULT_SCOPES: &str = "openid";
const CRIIPTO_DEFAULT_ACR_VALUES: &str = "urn:grn:authn:no:bankid";

/// Supported identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Vipps,
    Criipto,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Vipps, Provider::Criipto];

    /// Lower-case name used in routes and cookie prefixes
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Vipps => "vipps",
            Provider::Criipto => "criipto",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = OidcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vipps" => Ok(Provider::Vipps),
            "criipto" => Ok(Provider::Criipto),
            other => Err(OidcError::Configuration(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

/// Where identity claims are read from after the code exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimsSource {
    IdToken,
    Userinfo,
}

/// Client authentication at the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAuthMethod {
    /// HTTP Basic with client id and secret
    ClientSecretBasic,
    /// Client id and secret in the form body
    ClientSecretPost,
}

/// Raw, possibly incomplete provider settings as read from the environment
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub subscription_key: Option<String>,
    pub merchant_serial_number: Option<String>,
    /// Explicit discovery URL; Criipto falls back to `domain`
    pub discovery_url: Option<String>,
    pub domain: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Option<String>,
    pub acr_values: Option<String>,
}

/// Complete configuration for one provider
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub client_id: String,
    pub client_secret: String,
    pub discovery_url: String,
    pub scopes: Vec<String>,
    pub acr_values: Option<String>,
    pub claims_source: ClaimsSource,
    pub token_auth: TokenAuthMethod,
    /// Headers sent on every backchannel call (token, userinfo)
    pub extra_headers: Vec<(String, String)>,
    /// Redirect URI override; only honored when it matches the request origin
    pub redirect_uri_override: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("discovery_url", &self.discovery_url)
            .field("scopes", &self.scopes)
            .field("acr_values", &self.acr_values)
            .field("claims_source", &self.claims_source)
            .field("token_auth", &self.token_auth)
            .field("redirect_uri_override", &self.redirect_uri_override)
            .finish_non_exhaustive()
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn split_scopes(scopes: &str) -> Vec<String> {
    scopes
        .split(|c: char| c == ' ' || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ProviderConfig {
    /// Resolve settings into a usable configuration.
    ///
    /// Fails with [`OidcError::Configuration`] naming every missing setting.
    pub fn from_settings(provider: Provider, settings: &ProviderSettings) -> Result<Self> {
        let client_id = present(&settings.client_id);
        let client_secret = present(&settings.client_secret);

        let mut missing = Vec::new();
        if client_id.is_none() {
            missing.push("client_id");
        }
        if client_secret.is_none() {
            missing.push("client_secret");
        }

        let config = match provider {
            Provider::Vipps => {
                let subscription_key = present(&settings.subscription_key);
                if subscription_key.is_none() {
                    missing.push("subscription_key");
                }
                let discovery_url = present(&settings.discovery_url)
                    .unwrap_or_else(|| VIPPS_DISCOVERY_URL.to_string());

                let mut extra_headers = Vec::new();
                if let Some(key) = subscription_key {
                    extra_headers.push(("Ocp-Apim-Subscription-Key".to_string(), key));
                }
                if let Some(msn) = present(&settings.merchant_serial_number) {
                    extra_headers.push(("Merchant-Serial-Number".to_string(), msn));
                }

                Self {
                    provider,
                    client_id: client_id.clone().unwrap_or_default(),
                    client_secret: client_secret.clone().unwrap_or_default(),
                    discovery_url,
                    scopes: split_scopes(
                        &present(&settings.scopes).unwrap_or_else(|| VIPPS_DEFAULT_SCOPES.into()),
                    ),
                    acr_values: present(&settings.acr_values),
                    claims_source: ClaimsSource::Userinfo,
                    token_auth: TokenAuthMethod::ClientSecretBasic,
                    extra_headers,
                    redirect_uri_override: present(&settings.redirect_uri),
                }
            }
            Provider::Criipto => {
                let discovery_url = match (
                    present(&settings.discovery_url),
                    present(&settings.domain),
                ) {
                    (Some(url), _) => Some(url),
                    (None, Some(domain)) => Some(criipto_discovery_url(&domain)),
                    (None, None) => None,
                };
                if discovery_url.is_none() {
                    missing.push("domain");
                }

                Self {
                    provider,
                    client_id: client_id.clone().unwrap_or_default(),
                    client_secret: client_secret.clone().unwrap_or_default(),
                    discovery_url: discovery_url.unwrap_or_default(),
                    scopes: split_scopes(
                        &present(&settings.scopes)
                            .unwrap_or_else(|| CRIIPTO_DEFAULT_SCOPES.into()),
                    ),
                    acr_values: Some(
                        present(&settings.acr_values)
                            .unwrap_or_else(|| CRIIPTO_DEFAULT_ACR_VALUES.into()),
                    ),
                    claims_source: ClaimsSource::IdToken,
                    token_auth: TokenAuthMethod::ClientSecretPost,
                    extra_headers: Vec::new(),
                    redirect_uri_override: present(&settings.redirect_uri),
                }
            }
        };

        if !missing.is_empty() {
            return Err(OidcError::Configuration(format!(
                "{} missing {}",
                provider,
                missing.join(", ")
            )));
        }

        if !config.scopes.iter().any(|s| s == "openid") {
            return Err(OidcError::Configuration(format!(
                "{provider} scopes must include openid"
            )));
        }

        Ok(config)
    }
}

fn criipto_discovery_url(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("https://") || domain.starts_with("http://") {
        format!("{domain}/.well-known/openid-configuration")
    } else {
        format!("https://{domain}/.well-known/openid-configuration")
    }
}
