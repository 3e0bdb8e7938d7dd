use axum::{extract::State, response::Json};
use idgate_oidc::Provider;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: &'static str,
    providers: Vec<Provider>,
    email: bool,
}

/// Readiness check endpoint; lists the providers that can start a flow
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let providers = Provider::ALL
        .into_iter()
        .filter(|p| state.providers.contains_key(p))
        .collect();

    Json(ReadinessResponse {
        status: "ready",
        providers,
        email: state.mailbox.is_some(),
    })
}
