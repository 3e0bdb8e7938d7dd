use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response},
    middleware::Next,
    response::IntoResponse,
};
use idgate_crypto::current_timestamp;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::request_context::extract_client_ip;
use crate::state::AppState;

fn direct_ip_from_request(req: &Request<Body>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

/// Request ID middleware for request tracking and logging
///
/// Reuses an incoming `X-Request-ID` or generates one, logs request start
/// and completion with timing, and echoes the ID on the response.
pub async fn request_id_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let request_id = req
        .headers()
        .get("X-Request-ID")
        .and_then(|h| h.to_str().ok())
        .filter(|id| !id.is_empty() && id.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if let Ok(header_value) = request_id.parse() {
        req.headers_mut().insert("X-Request-ID", header_value);
    } else {
        tracing::warn!("Failed to create header value for request ID");
    }

    let direct_ip = direct_ip_from_request(&req);
    let ip_address = extract_client_ip(req.headers(), direct_ip, &state.config.trusted_proxies);

    let user_agent = req
        .headers()
        .get("User-Agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown");

    // Query strings carry codes and state; log the path only
    tracing::info!(
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
        ip = %ip_address,
        user_agent = %user_agent,
        "Request started"
    );

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-ID", header_value);
    }

    tracing::info!(
        request_id = %request_id,
        status = %response.status(),
        elapsed_ms = elapsed.as_millis(),
        "Request completed"
    );

    response
}

/// Per-IP throttle for magic-link requests
///
/// Runs before the handler so rejected requests never reach the identity
/// backend. Successful responses carry `X-RateLimit-*` headers.
pub async fn email_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let direct_ip = direct_ip_from_request(&req);
    let ip_address = extract_client_ip(req.headers(), direct_ip, &state.config.trusted_proxies);
    let key = format!("email-link:{ip_address}");

    match state
        .rate_limiter
        .check(&key, &state.config.email_link_rule, current_timestamp())
    {
        Ok(rate_limit) => {
            tracing::trace!(
                ip = %ip_address,
                remaining = rate_limit.remaining,
                "Rate limit check passed"
            );

            let mut response = next.run(req).await;
            let headers = response.headers_mut();

            if let Ok(value) = rate_limit.limit.to_string().parse() {
                headers.insert("X-RateLimit-Limit", value);
            }
            if let Ok(value) = rate_limit.remaining.to_string().parse() {
                headers.insert("X-RateLimit-Remaining", value);
            }
            if let Ok(value) = rate_limit.reset_at.to_string().parse() {
                headers.insert("X-RateLimit-Reset", value);
            }

            response
        }
        Err(e) => {
            tracing::warn!(ip = %ip_address, "Magic-link rate limit exceeded");
            ApiError::from(e).into_response()
        }
    }
}
