use anyhow::Result;
use idgate_crypto::derive_cookie_signing_key;
use idgate_oidc::{
    DiscoveryCache, OidcClient, Provider, ProviderConfig, ProviderHttp, ReqwestProviderHttp,
    DEFAULT_DISCOVERY_TTL_SECS,
};
use idgate_policy::RateLimiter;
use idgate_sessions::SessionSealer;
use std::collections::HashMap;
use std::sync::Arc;
use tower_cookies::Key;

use crate::config::Config;
use crate::mailbox::{GoTrueMailbox, MailboxBackend};

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub oidc: OidcClient,
    /// Providers whose configuration is complete; others fail closed
    pub providers: HashMap<Provider, ProviderConfig>,
    pub sealer: SessionSealer,
    /// Signs the handshake cookies
    pub cookie_key: Key,
    pub mailbox: Option<Arc<dyn MailboxBackend>>,
    /// Per-IP throttle for magic-link requests
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Build state with the production HTTP clients
    pub fn from_config(config: Config) -> Result<Self> {
        let http: Arc<dyn ProviderHttp> = Arc::new(ReqwestProviderHttp::new(config.http_timeout)?);

        let mailbox = match &config.mailbox {
            Some(settings) => Some(
                Arc::new(GoTrueMailbox::new(settings, config.http_timeout)?)
                    as Arc<dyn MailboxBackend>,
            ),
            None => None,
        };

        Self::new(config, http, mailbox)
    }

    pub fn new(
        config: Config,
        http: Arc<dyn ProviderHttp>,
        mailbox: Option<Arc<dyn MailboxBackend>>,
    ) -> Result<Self> {
        let mut providers = HashMap::new();
        for provider in Provider::ALL {
            let Some(settings) = config.providers.get(&provider) else {
                tracing::warn!(provider = %provider, "Provider not configured");
                continue;
            };
            match ProviderConfig::from_settings(provider, settings) {
                Ok(provider_config) => {
                    tracing::info!(provider = %provider, "Provider configured");
                    providers.insert(provider, provider_config);
                }
                Err(e) => {
                    tracing::warn!(provider = %provider, error = %e, "Provider not configured");
                }
            }
        }

        if mailbox.is_none() {
            tracing::warn!("Identity backend not configured; email sessions disabled");
        }

        let sealer = SessionSealer::new(&config.session_secret)?;
        let signing_key = derive_cookie_signing_key(&config.session_secret)?;
        let cookie_key = Key::from(&signing_key[..]);

        let discovery = Arc::new(DiscoveryCache::new(DEFAULT_DISCOVERY_TTL_SECS));

        Ok(AppState {
            oidc: OidcClient::new(http, discovery),
            providers,
            sealer,
            cookie_key,
            mailbox,
            rate_limiter: RateLimiter::new(),
            config,
        })
    }

    pub fn provider(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.providers.get(&provider)
    }

    /// Scheme assumed when no trusted proxy reports one
    pub fn default_scheme(&self) -> &'static str {
        if self.config.cookie_secure {
            "https"
        } else {
            "http"
        }
    }
}
