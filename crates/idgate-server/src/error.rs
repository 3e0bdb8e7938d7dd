use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Errors returned by the JSON endpoints
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limited")]
    RateLimited {
        limit: u32,
        reset_at: u64,
        retry_after: u64,
    },

    /// Feature not configured on this deployment
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Identity backend failed; detail stays in the log
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

fn header_value(value: impl ToString) -> Option<HeaderValue> {
    HeaderValue::from_str(&value.to_string()).ok()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut rate_limit_headers = None;

        let (status, code, message, details) = match self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "No valid session".to_string(),
                None,
            ),
            ApiError::RateLimited {
                limit,
                reset_at,
                retry_after,
            } => {
                rate_limit_headers = Some((limit, reset_at, retry_after));
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    "Too many requests".to_string(),
                    Some(serde_json::json!({ "retryAfter": retry_after })),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
            ApiError::Upstream(detail) => {
                tracing::warn!(detail = %detail, "Upstream failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "Identity backend unavailable".to_string(),
                    None,
                )
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorDetails {
                code: code.to_string(),
                message,
                details,
            },
        });

        let mut response = (status, body).into_response();

        if let Some((limit, reset_at, retry_after)) = rate_limit_headers {
            let headers = response.headers_mut();
            if let Some(value) = header_value(retry_after) {
                headers.insert(header::RETRY_AFTER, value);
            }
            if let Some(value) = header_value(limit) {
                headers.insert("X-RateLimit-Limit", value);
            }
            headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
            if let Some(value) = header_value(reset_at) {
                headers.insert("X-RateLimit-Reset", value);
            }
        }

        response
    }
}

impl From<idgate_policy::PolicyError> for ApiError {
    fn from(err: idgate_policy::PolicyError) -> Self {
        match err {
            idgate_policy::PolicyError::RateLimited {
                limit,
                reset_at,
                retry_after,
            } => ApiError::RateLimited {
                limit,
                reset_at,
                retry_after,
            },
            other => ApiError::Internal(other.into()),
        }
    }
}
