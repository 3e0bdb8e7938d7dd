//! # idgate-policy
//!
//! Request throttling for abuse-prone endpoints (magic-link delivery).

#![warn(clippy::all)]

pub mod errors;
pub mod rate_limit;
pub mod types;

pub use errors::{PolicyError, Result};
pub use rate_limit::RateLimiter;
pub use types::*;
