use axum::{extract::State, http::StatusCode, response::Json};
use idgate_sessions::{IdentitySession, SessionSummary};
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::{
    cookies::{clear_identity_session, read_identity_session},
    extractors::VerifiedIdentity,
    state::AppState,
};

/// `GET /api/session`: public summary, `verified: false` for any unusable cookie
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Json<SessionSummary> {
    let session = read_identity_session(&cookies, &state.sealer);
    Json(SessionSummary::from(session.as_ref()))
}

/// `GET /api/session/identity`: full verified profile
pub async fn get_identity(VerifiedIdentity(session): VerifiedIdentity) -> Json<IdentitySession> {
    Json(session)
}

/// `POST /api/session/logout`
pub async fn logout(State(state): State<Arc<AppState>>, cookies: Cookies) -> StatusCode {
    clear_identity_session(&cookies, state.config.cookie_secure);
    StatusCode::NO_CONTENT
}
