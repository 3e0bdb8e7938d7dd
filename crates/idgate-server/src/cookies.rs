//! Cookie helpers for the handshake, identity and email sessions.

use idgate_oidc::Provider;
use idgate_sessions::{
    EmailSession, FlowIntent, HandshakeContext, IdentitySession, SessionSealer,
    EMAIL_SESSION_COOKIE, EMAIL_SESSION_MAX_AGE_SECS, HANDSHAKE_MAX_AGE_SECS,
    IDENTITY_SESSION_COOKIE,
};
use tower_cookies::{
    cookie::{time::Duration, SameSite},
    Cookie, Cookies, Key,
};

fn build_cookie(name: String, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

fn clear_cookie(cookies: &Cookies, name: String, secure: bool) {
    cookies.add(build_cookie(name, String::new(), 0, secure));
}

/// Handshake values as read back at the callback. Any of them may be missing.
#[derive(Clone)]
pub struct StoredHandshake {
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub intent: FlowIntent,
}

impl std::fmt::Debug for StoredHandshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredHandshake")
            .field("state", &self.state.is_some())
            .field("nonce", &self.nonce.is_some())
            .field("intent", &self.intent)
            .finish()
    }
}

/// Set the signed `{provider}_state`, `{provider}_nonce` and `{provider}_intent` cookies
pub fn set_handshake(
    cookies: &Cookies,
    key: &Key,
    provider: Provider,
    handshake: &HandshakeContext,
    secure: bool,
) -> idgate_sessions::Result<()> {
    let intent = handshake.intent.encode()?;
    let signed = cookies.signed(key);

    signed.add(build_cookie(
        HandshakeContext::state_cookie(provider),
        handshake.state.clone(),
        HANDSHAKE_MAX_AGE_SECS,
        secure,
    ));
    signed.add(build_cookie(
        HandshakeContext::nonce_cookie(provider),
        handshake.nonce.clone(),
        HANDSHAKE_MAX_AGE_SECS,
        secure,
    ));
    signed.add(build_cookie(
        HandshakeContext::intent_cookie(provider),
        intent,
        HANDSHAKE_MAX_AGE_SECS,
        secure,
    ));
    Ok(())
}

/// Read the handshake cookies. Unsigned or tampered values count as missing.
pub fn read_handshake(
    cookies: &Cookies,
    key: &Key,
    provider: Provider,
    default_flow: &str,
) -> StoredHandshake {
    let signed = cookies.signed(key);
    let value = |name: String| {
        signed
            .get(&name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    };

    let intent = value(HandshakeContext::intent_cookie(provider))
        .and_then(|encoded| FlowIntent::decode(&encoded, default_flow))
        .unwrap_or_else(|| FlowIntent::fallback(default_flow));

    StoredHandshake {
        state: value(HandshakeContext::state_cookie(provider)),
        nonce: value(HandshakeContext::nonce_cookie(provider)),
        intent,
    }
}

pub fn clear_handshake(cookies: &Cookies, provider: Provider, secure: bool) {
    for name in HandshakeContext::cookie_names(provider) {
        clear_cookie(cookies, name, secure);
    }
}

pub fn set_identity_session(cookies: &Cookies, sealed: String, max_age_secs: i64, secure: bool) {
    cookies.add(build_cookie(
        IDENTITY_SESSION_COOKIE.to_string(),
        sealed,
        max_age_secs,
        secure,
    ));
}

/// Current identity session, if the cookie opens and is still valid
pub fn read_identity_session(cookies: &Cookies, sealer: &SessionSealer) -> Option<IdentitySession> {
    cookies
        .get(IDENTITY_SESSION_COOKIE)
        .and_then(|c| sealer.open(c.value()))
}

pub fn clear_identity_session(cookies: &Cookies, secure: bool) {
    clear_cookie(cookies, IDENTITY_SESSION_COOKIE.to_string(), secure);
}

/// Set the signed `email_session` cookie holding the normalized address
pub fn set_email_session(cookies: &Cookies, key: &Key, session: &EmailSession, secure: bool) {
    cookies.signed(key).add(build_cookie(
        EMAIL_SESSION_COOKIE.to_string(),
        session.email.clone(),
        EMAIL_SESSION_MAX_AGE_SECS,
        secure,
    ));
}

/// Current email session. Unsigned or tampered cookies count as missing.
pub fn read_email_session(cookies: &Cookies, key: &Key) -> Option<EmailSession> {
    cookies
        .signed(key)
        .get(EMAIL_SESSION_COOKIE)
        .and_then(|c| EmailSession::new(c.value()).ok())
}

pub fn clear_email_session(cookies: &Cookies, secure: bool) {
    clear_cookie(cookies, EMAIL_SESSION_COOKIE.to_string(), secure);
}
