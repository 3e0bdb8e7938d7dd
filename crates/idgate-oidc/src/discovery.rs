//! Injected cache for discovery documents and key sets.

use crate::client::ProviderHttp;
use crate::errors::Result;
use crate::types::{CacheEntry, JwksKeySet, OidcConfiguration};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Default lifetime of cached discovery documents and key sets
pub const DEFAULT_DISCOVERY_TTL_SECS: u64 = 600;

/// TTL cache keyed by discovery URL and JWKS URI.
///
/// Owned by the application state. Concurrent misses may fetch redundantly;
/// the last writer wins. Incomplete discovery documents are never stored.
#[derive(Debug)]
pub struct DiscoveryCache {
    ttl: u64,
    configurations: RwLock<HashMap<String, CacheEntry<OidcConfiguration>>>,
    key_sets: RwLock<HashMap<String, CacheEntry<JwksKeySet>>>,
}

impl DiscoveryCache {
    pub fn new(ttl: u64) -> Self {
        Self {
            ttl,
            configurations: RwLock::new(HashMap::new()),
            key_sets: RwLock::new(HashMap::new()),
        }
    }

    /// Cached discovery document for `url`, fetching on miss or expiry
    pub async fn configuration(
        &self,
        http: &dyn ProviderHttp,
        url: &str,
        now: u64,
    ) -> Result<OidcConfiguration> {
        {
            let cache = self.configurations.read().await;
            if let Some(entry) = cache.get(url) {
                if entry.is_valid(now) {
                    return Ok(entry.value.clone());
                }
            }
        }

        let config = http.fetch_discovery(url).await?;
        config.validate()?;

        tracing::debug!(url = %url, issuer = %config.issuer, "Discovery document cached");

        self.configurations.write().await.insert(
            url.to_string(),
            CacheEntry {
                value: config.clone(),
                fetched_at: now,
                ttl: self.ttl,
            },
        );

        Ok(config)
    }

    /// Cached key set for `jwks_uri`, fetching on miss or expiry
    pub async fn key_set(
        &self,
        http: &dyn ProviderHttp,
        jwks_uri: &str,
        now: u64,
    ) -> Result<JwksKeySet> {
        {
            let cache = self.key_sets.read().await;
            if let Some(entry) = cache.get(jwks_uri) {
                if entry.is_valid(now) {
                    return Ok(entry.value.clone());
                }
            }
        }

        self.refresh_key_set(http, jwks_uri, now).await
    }

    /// Fetch the key set unconditionally and replace the cached copy
    pub async fn refresh_key_set(
        &self,
        http: &dyn ProviderHttp,
        jwks_uri: &str,
        now: u64,
    ) -> Result<JwksKeySet> {
        let jwks = http.fetch_jwks(jwks_uri).await?;

        self.key_sets.write().await.insert(
            jwks_uri.to_string(),
            CacheEntry {
                value: jwks.clone(),
                fetched_at: now,
                ttl: self.ttl,
            },
        );

        Ok(jwks)
    }

    /// Drop everything
    pub async fn clear(&self) {
        self.configurations.write().await.clear();
        self.key_sets.write().await.clear();
    }
}

impl Default for DiscoveryCache {
    fn default() -> Self {
        Self::new(DEFAULT_DISCOVERY_TTL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OidcError;
    use crate::testing::{test_discovery, MockProviderHttp};

    const URL: &str = "https://idp.test/.well-known/openid-configuration";

    #[tokio::test]
    async fn test_cache_hit_within_ttl() {
        let http = MockProviderHttp::new();
        let cache = DiscoveryCache::default();

        let first = cache.configuration(&http, URL, 1000).await.unwrap();
        let second = cache.configuration(&http, URL, 1599).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(MockProviderHttp::calls(&http.discovery_calls), 1);
    }

    #[tokio::test]
    async fn test_refetch_after_expiry() {
        let http = MockProviderHttp::new();
        let cache = DiscoveryCache::default();

        cache.configuration(&http, URL, 1000).await.unwrap();
        cache.configuration(&http, URL, 1600).await.unwrap();

        assert_eq!(MockProviderHttp::calls(&http.discovery_calls), 2);
    }

    #[tokio::test]
    async fn test_incomplete_document_not_cached() {
        let http = MockProviderHttp::new();
        let mut incomplete = test_discovery();
        incomplete.jwks_uri = String::new();
        *http.discovery.lock().unwrap() = Some(incomplete);

        let cache = DiscoveryCache::default();
        let err = cache.configuration(&http, URL, 1000).await.unwrap_err();
        assert!(matches!(err, OidcError::Discovery(_)));

        // A corrected document is fetched on the next call
        *http.discovery.lock().unwrap() = Some(test_discovery());
        cache.configuration(&http, URL, 1001).await.unwrap();
        assert_eq!(MockProviderHttp::calls(&http.discovery_calls), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let http = MockProviderHttp::new();
        *http.discovery.lock().unwrap() = None;

        let cache = DiscoveryCache::default();
        let err = cache.configuration(&http, URL, 1000).await.unwrap_err();
        assert!(matches!(err, OidcError::Discovery(_)));
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let http = MockProviderHttp::new();
        let cache = DiscoveryCache::default();

        cache.configuration(&http, URL, 1000).await.unwrap();
        cache.key_set(&http, "https://idp.test/jwks", 1000).await.unwrap();
        cache.clear().await;
        cache.configuration(&http, URL, 1001).await.unwrap();
        cache.key_set(&http, "https://idp.test/jwks", 1001).await.unwrap();

        assert_eq!(MockProviderHttp::calls(&http.discovery_calls), 2);
        assert_eq!(MockProviderHttp::calls(&http.jwks_calls), 2);
    }

    #[tokio::test]
    async fn test_key_set_cached() {
        let http = MockProviderHttp::new();
        let cache = DiscoveryCache::new(60);

        cache.key_set(&http, "https://idp.test/jwks", 1000).await.unwrap();
        cache.key_set(&http, "https://idp.test/jwks", 1059).await.unwrap();
        assert_eq!(MockProviderHttp::calls(&http.jwks_calls), 1);

        cache.key_set(&http, "https://idp.test/jwks", 1060).await.unwrap();
        assert_eq!(MockProviderHttp::calls(&http.jwks_calls), 2);
    }
}
