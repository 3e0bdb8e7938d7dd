//! Magic-link email sessions.

use axum::{extract::State, http::StatusCode, response::Json};
use idgate_crypto::hash_for_log;
use idgate_sessions::{normalize_email, EmailSession};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_cookies::Cookies;

use super::helpers::magic_link_redirect;
use crate::{
    cookies::{clear_email_session, read_email_session, set_email_session},
    error::ApiError,
    mailbox::{MailboxBackend, MailboxError},
    request_context::RequestContext,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendLinkRequest {
    pub email: String,
    pub redirect_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendLinkResponse {
    pub sent: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct EmailSessionResponse {
    pub email: String,
}

fn require_mailbox(state: &AppState) -> Result<&dyn MailboxBackend, ApiError> {
    state
        .mailbox
        .as_deref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Email sign-in is not configured".to_string()))
}

/// `POST /api/email/send-link`
///
/// Throttled per client IP by `email_rate_limit_middleware` before this runs.
pub async fn send_link(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    Json(req): Json<SendLinkRequest>,
) -> Result<Json<SendLinkResponse>, ApiError> {
    let email = normalize_email(&req.email)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    let mailbox = require_mailbox(&state)?;

    let origin = context
        .origin
        .as_deref()
        .ok_or_else(|| ApiError::InvalidRequest("Cannot determine request origin".to_string()))?;
    let redirect_to = magic_link_redirect(origin, req.redirect_to.as_deref());

    mailbox
        .send_magic_link(&email, &redirect_to)
        .await
        .map_err(|e| match e {
            MailboxError::Rejected => {
                ApiError::InvalidRequest("Email address was rejected".to_string())
            }
            MailboxError::Unavailable(detail) => ApiError::Upstream(detail),
        })?;

    tracing::info!(
        email = %hash_for_log(&email),
        ip = %context.ip_address,
        "Magic link sent"
    );

    Ok(Json(SendLinkResponse { sent: true }))
}

/// `POST /api/email/verify`: trade the link's access token for an email session
pub async fn verify(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<EmailSessionResponse>, ApiError> {
    let access_token = req.access_token.trim();
    if access_token.is_empty() {
        return Err(ApiError::InvalidRequest("accessToken is required".to_string()));
    }
    let mailbox = require_mailbox(&state)?;

    let email = mailbox
        .verify_access_token(access_token)
        .await
        .map_err(|e| match e {
            MailboxError::Rejected => ApiError::Unauthorized,
            MailboxError::Unavailable(detail) => ApiError::Upstream(detail),
        })?;

    let session = EmailSession::new(&email)
        .map_err(|e| ApiError::Upstream(format!("backend returned unusable email: {e}")))?;

    set_email_session(&cookies, &state.cookie_key, &session, state.config.cookie_secure);
    tracing::info!(email = %hash_for_log(&session.email), "Email session established");

    Ok(Json(EmailSessionResponse {
        email: session.email,
    }))
}

/// `GET /api/email/session`
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<Json<EmailSessionResponse>, ApiError> {
    read_email_session(&cookies, &state.cookie_key)
        .map(|session| {
            Json(EmailSessionResponse {
                email: session.email,
            })
        })
        .ok_or(ApiError::Unauthorized)
}

/// `POST /api/email/logout`
pub async fn logout(State(state): State<Arc<AppState>>, cookies: Cookies) -> StatusCode {
    clear_email_session(&cookies, state.config.cookie_secure);
    StatusCode::NO_CONTENT
}
