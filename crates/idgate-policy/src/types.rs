//! Rate limit types.

use crate::errors::{PolicyError, Result};
use serde::{Deserialize, Serialize};

/// Default magic-link allowance per client IP
pub const DEFAULT_EMAIL_LINK_MAX_REQUESTS: u32 = 5;

/// Default magic-link window (15 minutes)
pub const DEFAULT_EMAIL_LINK_WINDOW_SECONDS: u64 = 900;

/// Fixed-window throttling rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub window_seconds: u64,
    pub max_requests: u32,
}

impl RateLimitRule {
    pub fn new(window_seconds: u64, max_requests: u32) -> Result<Self> {
        if window_seconds == 0 {
            return Err(PolicyError::InvalidRule("window must be non-zero".into()));
        }
        if max_requests == 0 {
            return Err(PolicyError::InvalidRule(
                "max requests must be non-zero".into(),
            ));
        }
        Ok(Self {
            window_seconds,
            max_requests,
        })
    }
}

impl Default for RateLimitRule {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_EMAIL_LINK_WINDOW_SECONDS,
            max_requests: DEFAULT_EMAIL_LINK_MAX_REQUESTS,
        }
    }
}

/// Outcome of an admitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: u64,
}
