//! Ephemeral state carried between authorization start and callback.

use crate::constants::MAX_FLOW_LEN;
use crate::errors::{Result, SessionError};
use base64::prelude::*;
use idgate_oidc::Provider;
use serde::{Deserialize, Serialize};

/// Where the browser goes once the flow finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowIntent {
    pub flow: String,
    #[serde(rename = "returnTo")]
    pub return_to: String,
}

/// Accept a lowercase slug of `[a-z0-9-]`, else `default_flow`
pub fn sanitize_flow(flow: Option<&str>, default_flow: &str) -> String {
    match flow {
        Some(f)
            if !f.is_empty()
                && f.len() <= MAX_FLOW_LEN
                && f
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-') =>
        {
            f.to_string()
        }
        _ => default_flow.to_string(),
    }
}

/// Accept a same-site absolute path, else `/`
pub fn sanitize_return_to(return_to: Option<&str>) -> String {
    match return_to {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

impl FlowIntent {
    pub fn new(flow: Option<&str>, return_to: Option<&str>, default_flow: &str) -> Self {
        Self {
            flow: sanitize_flow(flow, default_flow),
            return_to: sanitize_return_to(return_to),
        }
    }

    /// Intent used when the cookie is missing or unreadable
    pub fn fallback(default_flow: &str) -> Self {
        Self::new(None, None, default_flow)
    }

    /// base64url(JSON) for the intent cookie
    pub fn encode(&self) -> Result<String> {
        let json =
            serde_json::to_vec(self).map_err(|e| SessionError::Serialization(e.to_string()))?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(json))
    }

    /// Parse an intent cookie, re-applying sanitization
    pub fn decode(encoded: &str, default_flow: &str) -> Option<Self> {
        let json = BASE64_URL_SAFE_NO_PAD.decode(encoded.trim()).ok()?;
        let raw: FlowIntent = serde_json::from_slice(&json).ok()?;
        Some(Self::new(
            Some(&raw.flow),
            Some(&raw.return_to),
            default_flow,
        ))
    }

    /// `/{flow}?error=<reason>`
    pub fn error_path(&self, reason: &str) -> String {
        format!("/{}?error={}", self.flow, reason)
    }
}

/// The `state`, `nonce` and `intent` values of one authorization attempt.
///
/// Set together at initiation and cleared together at callback.
#[derive(Clone, PartialEq, Eq)]
pub struct HandshakeContext {
    pub state: String,
    pub nonce: String,
    pub intent: FlowIntent,
}

impl std::fmt::Debug for HandshakeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeContext")
            .field("state", &"<redacted>")
            .field("nonce", &"<redacted>")
            .field("intent", &self.intent)
            .finish()
    }
}

impl HandshakeContext {
    pub fn state_cookie(provider: Provider) -> String {
        format!("{provider}_state")
    }

    pub fn nonce_cookie(provider: Provider) -> String {
        format!("{provider}_nonce")
    }

    pub fn intent_cookie(provider: Provider) -> String {
        format!("{provider}_intent")
    }

    /// All three cookie names for `provider`
    pub fn cookie_names(provider: Provider) -> [String; 3] {
        [
            Self::state_cookie(provider),
            Self::nonce_cookie(provider),
            Self::intent_cookie(provider),
        ]
    }
}
