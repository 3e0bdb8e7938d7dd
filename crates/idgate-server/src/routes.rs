use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::api;
use crate::middleware::{email_rate_limit_middleware, request_id_middleware};
use crate::state::AppState;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let send_link = Router::new()
        .route("/api/email/send-link", post(api::email::send_link))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            email_rate_limit_middleware,
        ));

    Router::new()
        // Health checks
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // eID verification
        .route("/api/auth/:provider/start", get(api::identity::start))
        .route("/api/auth/:provider/callback", get(api::identity::callback))
        // Identity session
        .route("/api/session", get(api::session::get_session))
        .route("/api/session/identity", get(api::session::get_identity))
        .route("/api/session/logout", post(api::session::logout))
        // Email session
        .merge(send_link)
        .route("/api/email/verify", post(api::email::verify))
        .route("/api/email/session", get(api::email::get_session))
        .route("/api/email/logout", post(api::email::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_id_middleware,
        ))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}
