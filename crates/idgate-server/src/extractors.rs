use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use idgate_sessions::IdentitySession;
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::{cookies::read_identity_session, error::ApiError, state::AppState};

/// Extractor for requests carrying a verified identity
///
/// Opens the encrypted `identity_session` cookie and re-checks its expiry.
/// Missing, tampered and expired sessions are all rejected with 401.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity(pub IdentitySession);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for VerifiedIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::Internal(anyhow::anyhow!(msg)))?;

        read_identity_session(&cookies, &state.sealer)
            .map(VerifiedIdentity)
            .ok_or(ApiError::Unauthorized)
    }
}
