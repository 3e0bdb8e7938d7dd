use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

fn is_trusted(direct_ip: Option<IpAddr>, trusted_proxies: &[IpAddr]) -> bool {
    direct_ip.is_some_and(|ip| trusted_proxies.contains(&ip))
}

fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Extract client IP address with proxy validation
///
/// `X-Forwarded-For` (rightmost entry) and `X-Real-IP` are only read when
/// the direct peer is a trusted proxy. Otherwise the peer address is used,
/// or `"unknown"` when the connection carries none.
pub fn extract_client_ip(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
) -> String {
    if let Some(direct) = direct_ip {
        if trusted_proxies.contains(&direct) {
            if let Some(forwarded) = headers.get("X-Forwarded-For").and_then(|h| h.to_str().ok()) {
                if let Some(ip_str) = forwarded.split(',').next_back() {
                    let ip_str = ip_str.trim();
                    if ip_str.parse::<IpAddr>().is_ok() {
                        return ip_str.to_string();
                    }
                }
            }

            if let Some(real_ip) = headers.get("X-Real-IP").and_then(|h| h.to_str().ok()) {
                let ip_str = real_ip.trim();
                if ip_str.parse::<IpAddr>().is_ok() {
                    return ip_str.to_string();
                }
            }
        }

        return direct.to_string();
    }

    tracing::debug!("No direct connection IP available for request");
    "unknown".to_string()
}

fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 255
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

/// Public origin (`scheme://host`) the browser used to reach us.
///
/// `X-Forwarded-Proto` and `X-Forwarded-Host` are honored only from trusted
/// proxies. Without them the scheme is `default_scheme` and the host comes
/// from `Host`, then from the request URI authority.
pub fn request_origin(
    headers: &HeaderMap,
    uri_authority: Option<&str>,
    direct_ip: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
    default_scheme: &str,
) -> Option<String> {
    let trusted = is_trusted(direct_ip, trusted_proxies);

    let scheme = trusted
        .then(|| first_header_value(headers, "X-Forwarded-Proto"))
        .flatten()
        .map(str::to_ascii_lowercase)
        .filter(|s| s == "http" || s == "https")
        .unwrap_or_else(|| default_scheme.to_string());

    let host = trusted
        .then(|| first_header_value(headers, "X-Forwarded-Host"))
        .flatten()
        .or_else(|| first_header_value(headers, "Host"))
        .or(uri_authority)?
        .to_ascii_lowercase();

    if !is_valid_host(&host) {
        tracing::warn!("Rejecting malformed host header");
        return None;
    }

    Some(format!("{scheme}://{host}"))
}

fn direct_ip_from_parts(parts: &Parts) -> Option<IpAddr> {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

/// Request metadata used for throttling, redirects and logging
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Client IP address (connection or trusted `X-Forwarded-For`)
    pub ip_address: String,

    pub user_agent: String,

    /// `scheme://host` as seen by the browser, if it could be determined
    pub origin: Option<String>,
}

impl RequestContext {
    /// Context for one request. A configured `public_origin` wins over anything
    /// the request headers claim.
    pub fn from_parts(
        parts: &Parts,
        trusted_proxies: &[IpAddr],
        default_scheme: &str,
        public_origin: Option<&str>,
    ) -> Self {
        let direct_ip = direct_ip_from_parts(parts);
        let ip_address = extract_client_ip(&parts.headers, direct_ip, trusted_proxies);

        let user_agent = parts
            .headers
            .get("User-Agent")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let origin = match public_origin {
            Some(origin) => Some(origin.to_string()),
            None => request_origin(
                &parts.headers,
                parts.uri.authority().map(|a| a.as_str()),
                direct_ip,
                trusted_proxies,
                default_scheme,
            ),
        };

        Self {
            ip_address,
            user_agent,
            origin,
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_parts(
            parts,
            &state.config.trusted_proxies,
            state.default_scheme(),
            state.config.public_origin.as_deref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(headers: &[(&str, &str)], peer: Option<[u8; 4]>) -> Parts {
        let mut builder = Request::builder().uri("/api/auth/vipps/start");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        if let Some(ip) = peer {
            parts
                .extensions
                .insert(ConnectInfo(SocketAddr::from((ip, 443))));
        }
        parts
    }

    #[test]
    fn test_trusted_proxy_uses_forwarded_for() {
        let parts = parts_with(&[("X-Forwarded-For", "203.0.113.9")], Some([10, 0, 0, 10]));
        let trusted = vec!["10.0.0.10".parse().unwrap()];
        let context = RequestContext::from_parts(&parts, &trusted, "https", None);
        assert_eq!(context.ip_address, "203.0.113.9");
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarded_for() {
        let parts = parts_with(&[("X-Forwarded-For", "203.0.113.9")], Some([198, 51, 100, 1]));
        let context = RequestContext::from_parts(&parts, &[], "https", None);
        assert_eq!(context.ip_address, "198.51.100.1");
    }

    #[test]
    fn test_defaults_without_connection_info() {
        let parts = parts_with(&[], None);
        let context = RequestContext::from_parts(&parts, &[], "https", None);
        assert_eq!(context.ip_address, "unknown");
        assert_eq!(context.user_agent, "unknown");
        assert_eq!(context.origin, None);
    }

    #[test]
    fn test_origin_from_host_header() {
        let parts = parts_with(
            &[("Host", "App.Example.no"), ("X-Forwarded-Proto", "http")],
            Some([198, 51, 100, 1]),
        );
        let context = RequestContext::from_parts(&parts, &[], "https", None);
        assert_eq!(context.origin.as_deref(), Some("https://app.example.no"));
    }

    #[test]
    fn test_origin_from_trusted_proxy() {
        let parts = parts_with(
            &[
                ("Host", "internal:8080"),
                ("X-Forwarded-Proto", "https"),
                ("X-Forwarded-Host", "app.example.no"),
            ],
            Some([10, 0, 0, 10]),
        );
        let trusted = vec!["10.0.0.10".parse().unwrap()];
        let context = RequestContext::from_parts(&parts, &trusted, "http", None);
        assert_eq!(context.origin.as_deref(), Some("https://app.example.no"));
    }

    #[test]
    fn test_origin_untrusted_forwarded_host_ignored() {
        let parts = parts_with(
            &[("Host", "app.example.no"), ("X-Forwarded-Host", "evil.example")],
            Some([198, 51, 100, 1]),
        );
        let context = RequestContext::from_parts(&parts, &[], "https", None);
        assert_eq!(context.origin.as_deref(), Some("https://app.example.no"));
    }

    #[test]
    fn test_configured_origin_overrides_headers() {
        let parts = parts_with(
            &[("Host", "evil.example"), ("X-Forwarded-Host", "evil.example")],
            Some([10, 0, 0, 10]),
        );
        let trusted = vec!["10.0.0.10".parse().unwrap()];
        let context =
            RequestContext::from_parts(&parts, &trusted, "http", Some("https://id.example.no"));
        assert_eq!(context.origin.as_deref(), Some("https://id.example.no"));

        let parts = parts_with(&[("Host", "evil.example/path")], None);
        let context = RequestContext::from_parts(&parts, &[], "https", Some("https://id.example.no"));
        assert_eq!(context.origin.as_deref(), Some("https://id.example.no"));
    }

    #[test]
    fn test_origin_rejects_malformed_host() {
        let parts = parts_with(&[("Host", "evil.example/path")], None);
        let context = RequestContext::from_parts(&parts, &[], "https", None);
        assert_eq!(context.origin, None);
    }
}
