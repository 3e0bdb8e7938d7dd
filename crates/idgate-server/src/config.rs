use anyhow::{bail, Context, Result};
use idgate_oidc::{Provider, ProviderSettings};
use idgate_policy::{
    RateLimitRule, DEFAULT_EMAIL_LINK_MAX_REQUESTS, DEFAULT_EMAIL_LINK_WINDOW_SECONDS,
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use zeroize::Zeroizing;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_FLOW: &str = "verify";
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Magic-link backend settings
#[derive(Clone)]
pub struct MailboxSettings {
    pub base_url: String,
    pub api_key: Zeroizing<String>,
}

impl std::fmt::Debug for MailboxSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxSettings")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Server configuration
#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,

    /// Seals identity sessions and signs handshake cookies (>= 32 bytes)
    pub session_secret: Zeroizing<Vec<u8>>,

    /// Mark cookies `Secure`; also the scheme assumed when no trusted proxy says otherwise
    pub cookie_secure: bool,

    /// Peers whose `X-Forwarded-*` headers are believed
    pub trusted_proxies: Vec<IpAddr>,

    /// Fixed `scheme://host[:port]` for callback URLs and magic links; overrides request headers
    pub public_origin: Option<String>,

    /// Flow used when the requested one is missing or malformed
    pub default_flow: String,

    /// Timeout for every outbound call
    pub http_timeout: Duration,

    pub email_link_rule: RateLimitRule,

    /// Raw provider settings; incomplete entries stay unconfigured
    pub providers: HashMap<Provider, ProviderSettings>,

    pub mailbox: Option<MailboxSettings>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("cookie_secure", &self.cookie_secure)
            .field("trusted_proxies", &self.trusted_proxies)
            .field("public_origin", &self.public_origin)
            .field("default_flow", &self.default_flow)
            .field("http_timeout", &self.http_timeout)
            .field("email_link_rule", &self.email_link_rule)
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .field("mailbox", &self.mailbox)
            .finish_non_exhaustive()
    }
}

fn is_flow_slug(flow: &str) -> bool {
    !flow.is_empty()
        && flow.len() <= idgate_sessions::MAX_FLOW_LEN
        && flow
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn parse_public_origin(value: &str) -> Result<String> {
    let url = url::Url::parse(value).with_context(|| format!("PUBLIC_ORIGIN is not a URL: {value}"))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        bail!("PUBLIC_ORIGIN must be an http or https origin");
    }
    if url.path() != "/"
        || url.query().is_some()
        || url.fragment().is_some()
        || !url.username().is_empty()
        || url.password().is_some()
    {
        bail!("PUBLIC_ORIGIN must be scheme://host[:port] only, got {value}");
    }
    Ok(url.origin().ascii_serialization())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_address = var("BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
            .parse()
            .context("BIND_ADDRESS must be host:port")?;

        let session_secret = match lookup("SESSION_SECRET") {
            Some(secret) => Zeroizing::new(secret.into_bytes()),
            None => bail!("SESSION_SECRET environment variable required"),
        };
        if session_secret.len() < idgate_crypto::MIN_SECRET_SIZE {
            bail!(
                "SESSION_SECRET must be at least {} bytes",
                idgate_crypto::MIN_SECRET_SIZE
            );
        }

        let cookie_secure = match var("COOKIE_SECURE").as_deref() {
            None | Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(other) => bail!("COOKIE_SECURE must be true or false, got {other}"),
        };

        let trusted_proxies = var("TRUSTED_PROXIES")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        s.parse::<IpAddr>()
                            .with_context(|| format!("invalid TRUSTED_PROXIES entry {s}"))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let public_origin = var("PUBLIC_ORIGIN")
            .map(|v| parse_public_origin(&v))
            .transpose()?;

        let default_flow = var("DEFAULT_FLOW").unwrap_or_else(|| DEFAULT_FLOW.to_string());
        if !is_flow_slug(&default_flow) {
            bail!("DEFAULT_FLOW must match [a-z0-9-]{{1,32}}");
        }

        let http_timeout = Duration::from_secs(
            var("HTTP_TIMEOUT_SECONDS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("HTTP_TIMEOUT_SECONDS must be an integer")?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS),
        );
        if http_timeout.is_zero() {
            bail!("HTTP_TIMEOUT_SECONDS must be positive");
        }

        let max_requests = var("EMAIL_LINK_MAX_REQUESTS")
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("EMAIL_LINK_MAX_REQUESTS must be an integer")?
            .unwrap_or(DEFAULT_EMAIL_LINK_MAX_REQUESTS);
        let window_seconds = var("EMAIL_LINK_WINDOW_SECONDS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("EMAIL_LINK_WINDOW_SECONDS must be an integer")?
            .unwrap_or(DEFAULT_EMAIL_LINK_WINDOW_SECONDS);
        let email_link_rule = RateLimitRule::new(window_seconds, max_requests)?;

        let mut providers = HashMap::new();
        providers.insert(
            Provider::Vipps,
            ProviderSettings {
                client_id: var("VIPPS_CLIENT_ID"),
                client_secret: var("VIPPS_CLIENT_SECRET"),
                subscription_key: var("VIPPS_SUBSCRIPTION_KEY"),
                merchant_serial_number: var("VIPPS_MERCHANT_SERIAL_NUMBER"),
                discovery_url: var("VIPPS_DISCOVERY_URL"),
                domain: None,
                redirect_uri: var("VIPPS_REDIRECT_URI"),
                scopes: var("VIPPS_SCOPES"),
                acr_values: None,
            },
        );
        providers.insert(
            Provider::Criipto,
            ProviderSettings {
                client_id: var("CRIIPTO_CLIENT_ID"),
                client_secret: var("CRIIPTO_CLIENT_SECRET"),
                subscription_key: None,
                merchant_serial_number: None,
                discovery_url: None,
                domain: var("CRIIPTO_DOMAIN"),
                redirect_uri: var("CRIIPTO_REDIRECT_URI"),
                scopes: None,
                acr_values: var("CRIIPTO_ACR_VALUES"),
            },
        );

        let mailbox = match (var("IDENTITY_BACKEND_URL"), var("IDENTITY_BACKEND_API_KEY")) {
            (Some(base_url), Some(api_key)) => Some(MailboxSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: Zeroizing::new(api_key),
            }),
            (None, None) => None,
            _ => bail!("IDENTITY_BACKEND_URL and IDENTITY_BACKEND_API_KEY must be set together"),
        };

        Ok(Config {
            bind_address,
            session_secret,
            cookie_secure,
            trusted_proxies,
            public_origin,
            default_flow,
            http_timeout,
            email_link_rule,
            providers,
            mailbox,
        })
    }
}
