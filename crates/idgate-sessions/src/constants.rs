//! Cookie names and lifetimes.

/// Encrypted identity session cookie
pub const IDENTITY_SESSION_COOKIE: &str = "identity_session";

/// Plain email session cookie
pub const EMAIL_SESSION_COOKIE: &str = "email_session";

/// Identity sessions older than this are treated as absent
pub const IDENTITY_SESSION_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Tolerated clock skew for `verifiedAt` in the future
pub const VERIFIED_AT_FUTURE_SKEW_SECS: i64 = 60;

pub const EMAIL_SESSION_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Lifetime of the `state`, `nonce` and `intent` cookies
pub const HANDSHAKE_MAX_AGE_SECS: i64 = 10 * 60;

/// Longest accepted flow slug
pub const MAX_FLOW_LEN: usize = 32;
