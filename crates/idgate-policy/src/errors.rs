//! Policy error types.

use thiserror::Error;

/// Policy errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Too many requests in the current window
    #[error("Rate limit exceeded: {limit} requests per window, retry after {retry_after}s")]
    RateLimited {
        limit: u32,
        reset_at: u64,
        retry_after: u64,
    },

    /// Rule with a zero window or zero allowance
    #[error("Invalid rate limit rule: {0}")]
    InvalidRule(String),
}

pub type Result<T> = std::result::Result<T, PolicyError>;
