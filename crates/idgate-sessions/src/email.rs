//! Mailbox-possession sessions.

use crate::errors::{Result, SessionError};
use serde::{Deserialize, Serialize};

/// Proof that the holder controls a mailbox. Not a legal identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSession {
    pub email: String,
}

impl EmailSession {
    pub fn new(email: &str) -> Result<Self> {
        Ok(Self {
            email: normalize_email(email)?,
        })
    }
}

/// Trim, lower-case and validate an email address.
///
/// Rules: at most 254 characters, exactly one `@`, a 1-64 character local
/// part of `[a-z0-9._+-]`, and a dotted domain of `[a-z0-9.-]`.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();

    if email.is_empty() {
        return Err(SessionError::InvalidEmail("empty".into()));
    }
    if email.len() > 254 {
        return Err(SessionError::InvalidEmail("too long".into()));
    }

    let (local, domain) = match email.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => (local, domain),
        _ => {
            return Err(SessionError::InvalidEmail(
                "must contain exactly one @".into(),
            ))
        }
    };

    if local.is_empty() || local.len() > 64 {
        return Err(SessionError::InvalidEmail("local part length".into()));
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
    {
        return Err(SessionError::InvalidEmail("local part characters".into()));
    }

    if domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || domain.contains("..")
    {
        return Err(SessionError::InvalidEmail("domain".into()));
    }
    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
    {
        return Err(SessionError::InvalidEmail("domain characters".into()));
    }

    Ok(email)
}
