//! eID verification: authorization start and provider callback.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use chrono::Utc;
use idgate_crypto::{current_timestamp, hash_for_log};
use idgate_oidc::{CallbackParams, ExpectedHandshake, FailureReason};
use idgate_sessions::{FlowIntent, HandshakeContext, IdentitySession};
use serde::Deserialize;
use std::sync::Arc;
use tower_cookies::Cookies;

use super::helpers::{callback_redirect_uri, parse_provider};
use crate::{
    cookies::{clear_handshake, read_handshake, set_handshake, set_identity_session},
    request_context::RequestContext,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    pub flow: Option<String>,
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn error_redirect(intent: &FlowIntent, reason: FailureReason) -> Redirect {
    Redirect::to(&intent.error_path(reason.as_str()))
}

/// `GET /api/auth/:provider/start`
///
/// Redirects to the provider with fresh `state` and `nonce`, remembered in
/// signed handshake cookies. Unknown or unconfigured providers redirect to
/// the flow's error page without contacting anyone.
pub async fn start(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<StartQuery>,
    context: RequestContext,
    cookies: Cookies,
) -> Redirect {
    let intent = FlowIntent::new(
        query.flow.as_deref(),
        query.return_to.as_deref(),
        &state.config.default_flow,
    );

    let Some(provider) = parse_provider(&provider) else {
        tracing::warn!(provider = %provider, "Unknown identity provider");
        return error_redirect(&intent, FailureReason::Config);
    };

    let Some(config) = state.provider(provider) else {
        tracing::error!(provider = %provider, "Provider configuration incomplete");
        return error_redirect(&intent, FailureReason::Config);
    };

    let Some(redirect_uri) = callback_redirect_uri(
        provider,
        context.origin.as_deref(),
        config.redirect_uri_override.as_deref(),
    ) else {
        tracing::error!(provider = %provider, "Cannot determine request origin");
        return error_redirect(&intent, FailureReason::Config);
    };

    let authorization = match state
        .oidc
        .begin(config, &redirect_uri, current_timestamp())
        .await
    {
        Ok(authorization) => authorization,
        Err(e) => {
            tracing::error!(provider = %provider, error = %e, "Failed to start authorization");
            return error_redirect(&intent, e.failure_reason());
        }
    };

    let error_path = intent.error_path(FailureReason::AuthFailed.as_str());
    let handshake = HandshakeContext {
        state: authorization.state,
        nonce: authorization.nonce,
        intent,
    };

    if let Err(e) = set_handshake(
        &cookies,
        &state.cookie_key,
        provider,
        &handshake,
        state.config.cookie_secure,
    ) {
        tracing::error!(provider = %provider, error = %e, "Failed to store handshake");
        return Redirect::to(&error_path);
    }

    tracing::info!(
        provider = %provider,
        flow = %handshake.intent.flow,
        ip = %context.ip_address,
        "Redirecting to identity provider"
    );

    Redirect::to(&authorization.authorization_url)
}

/// `GET /api/auth/:provider/callback`
///
/// Handshake cookies are single-use and cleared on every outcome. On success
/// the encrypted identity session cookie is set and the browser returns to
/// the path recorded at start.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    context: RequestContext,
    cookies: Cookies,
) -> Redirect {
    let default_flow = &state.config.default_flow;
    let secure = state.config.cookie_secure;

    let Some(provider) = parse_provider(&provider) else {
        tracing::warn!(provider = %provider, "Callback for unknown identity provider");
        return error_redirect(&FlowIntent::fallback(default_flow), FailureReason::Config);
    };

    let stored = read_handshake(&cookies, &state.cookie_key, provider, default_flow);
    clear_handshake(&cookies, provider, secure);
    let intent = &stored.intent;

    if let Some(error) = query.error.as_deref() {
        tracing::warn!(provider = %provider, error = %error, "Provider returned an error");
    }

    // Cancelled or errored logins arrive without a code
    if query.code.as_deref().map_or(true, str::is_empty) {
        tracing::info!(provider = %provider, "Callback without authorization code");
        return error_redirect(intent, FailureReason::NoCode);
    }

    let Some(config) = state.provider(provider) else {
        tracing::error!(provider = %provider, "Provider configuration incomplete");
        return error_redirect(intent, FailureReason::Config);
    };

    let Some(redirect_uri) = callback_redirect_uri(
        provider,
        context.origin.as_deref(),
        config.redirect_uri_override.as_deref(),
    ) else {
        tracing::error!(provider = %provider, "Cannot determine request origin");
        return error_redirect(intent, FailureReason::Config);
    };

    let params = CallbackParams {
        code: query.code.as_deref(),
        state: query.state.as_deref(),
    };
    let expected = ExpectedHandshake {
        state: stored.state.as_deref(),
        nonce: stored.nonce.as_deref(),
        redirect_uri: &redirect_uri,
    };

    let claims = match state
        .oidc
        .complete(config, params, expected, current_timestamp())
        .await
    {
        Ok(claims) => claims,
        Err(e) => {
            if e.is_security_event() {
                tracing::warn!(
                    provider = %provider,
                    ip = %context.ip_address,
                    error = %e,
                    "Rejected forged or replayed callback"
                );
            } else {
                tracing::warn!(provider = %provider, error = %e, "Provider callback failed");
            }
            return error_redirect(intent, e.failure_reason());
        }
    };

    let now = Utc::now();
    let session = match IdentitySession::from_claims(provider, &claims, now) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(provider = %provider, error = %e, "Cannot issue identity session");
            return error_redirect(intent, FailureReason::AuthFailed);
        }
    };

    let sealed = match state.sealer.seal(&session) {
        Ok(sealed) => sealed,
        Err(e) => {
            tracing::error!(provider = %provider, error = %e, "Failed to seal identity session");
            return error_redirect(intent, FailureReason::AuthFailed);
        }
    };

    set_identity_session(&cookies, sealed, session.remaining_lifetime(now), secure);

    tracing::info!(
        provider = %provider,
        subject = %hash_for_log(&session.provider_user_id),
        flow = %intent.flow,
        "Identity verified"
    );

    Redirect::to(&intent.return_to)
}
