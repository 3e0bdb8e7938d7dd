//! Shared API helper functions.

use idgate_oidc::Provider;
use idgate_sessions::handshake::sanitize_return_to;

/// Parse the `:provider` path segment
pub fn parse_provider(segment: &str) -> Option<Provider> {
    segment.parse().ok()
}

/// `origin` followed by end of string or `/`
fn is_within_origin(candidate: &str, origin: &str) -> bool {
    match candidate.strip_prefix(origin) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Redirect URI registered with the provider for this request.
///
/// Defaults to `{origin}/api/auth/{provider}/callback`. A configured
/// override is used only when it lies under the request origin. Returns
/// `None` when the origin is unknown.
pub fn callback_redirect_uri(
    provider: Provider,
    origin: Option<&str>,
    override_uri: Option<&str>,
) -> Option<String> {
    let origin = origin?;

    if let Some(candidate) = override_uri {
        if is_within_origin(candidate, origin) {
            return Some(candidate.to_string());
        }
        tracing::warn!(
            provider = %provider,
            "Ignoring redirect URI override outside the request origin"
        );
    }

    Some(format!("{origin}/api/auth/{provider}/callback"))
}

/// Absolute URL the magic link should land on.
///
/// Accepts a same-origin absolute URL or a same-site path; anything else
/// lands on `/`.
pub fn magic_link_redirect(origin: &str, redirect_to: Option<&str>) -> String {
    if let Some(candidate) = redirect_to {
        if is_within_origin(candidate, origin) {
            let path = &candidate[origin.len()..];
            return format!("{origin}{}", sanitize_return_to(Some(path).filter(|p| !p.is_empty())));
        }
    }
    format!("{origin}{}", sanitize_return_to(redirect_to))
}
