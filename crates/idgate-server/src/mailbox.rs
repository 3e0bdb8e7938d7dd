//! Magic-link identity backend.
//!
//! The backend speaks the GoTrue REST dialect: `POST /auth/v1/otp` mails a
//! link, `GET /auth/v1/user` resolves the access token carried back by that
//! link. Every call is authenticated with an `apikey` header.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use zeroize::Zeroizing;

use crate::config::MailboxSettings;

const MAX_LOGGED_BODY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    /// Backend refused the token or address
    #[error("rejected by identity backend")]
    Rejected,

    /// Backend unreachable or answered with a server error
    #[error("identity backend unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, MailboxError>;

/// Sends magic links and resolves the tokens they carry
#[async_trait]
pub trait MailboxBackend: Send + Sync {
    /// Ask the backend to mail a sign-in link for `email`
    async fn send_magic_link(&self, email: &str, redirect_to: &str) -> Result<()>;

    /// Return the mailbox address an access token was issued to
    async fn verify_access_token(&self, access_token: &str) -> Result<String>;
}

#[derive(Serialize)]
struct OtpRequest<'a> {
    email: &'a str,
    create_user: bool,
}

#[derive(Deserialize)]
struct UserResponse {
    #[serde(default)]
    email: Option<String>,
}

/// [`MailboxBackend`] over a GoTrue-compatible REST API
pub struct GoTrueMailbox {
    http_client: Client,
    base_url: String,
    api_key: Zeroizing<String>,
}

impl std::fmt::Debug for GoTrueMailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoTrueMailbox")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_LOGGED_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

impl GoTrueMailbox {
    pub fn new(settings: &MailboxSettings, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    async fn failure(response: reqwest::Response, operation: &str) -> MailboxError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            operation,
            status = %status,
            body = %truncate(&body),
            "Identity backend returned an error"
        );

        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::UNPROCESSABLE_ENTITY
            || status == StatusCode::BAD_REQUEST
        {
            MailboxError::Rejected
        } else {
            MailboxError::Unavailable(format!("{operation} returned {status}"))
        }
    }
}

#[async_trait]
impl MailboxBackend for GoTrueMailbox {
    async fn send_magic_link(&self, email: &str, redirect_to: &str) -> Result<()> {
        let response = self
            .http_client
            .post(format!("{}/auth/v1/otp", self.base_url))
            .query(&[("redirect_to", redirect_to)])
            .header("apikey", self.api_key.as_str())
            .json(&OtpRequest {
                email,
                create_user: true,
            })
            .send()
            .await
            .map_err(|e| MailboxError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::failure(response, "otp").await);
        }
        Ok(())
    }

    async fn verify_access_token(&self, access_token: &str) -> Result<String> {
        let response = self
            .http_client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", self.api_key.as_str())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| MailboxError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::failure(response, "user").await);
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| MailboxError::Unavailable(format!("malformed user response: {e}")))?;

        user.email
            .filter(|email| !email.trim().is_empty())
            .ok_or(MailboxError::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(2000);
        assert_eq!(truncate(&body).len(), MAX_LOGGED_BODY);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_base_url_normalized_and_key_hidden() {
        let settings = MailboxSettings {
            base_url: "https://backend.example.no/".to_string(),
            api_key: Zeroizing::new("anon-key".to_string()),
        };
        let mailbox = GoTrueMailbox::new(&settings, Duration::from_secs(5)).unwrap();
        assert_eq!(mailbox.base_url, "https://backend.example.no");
        assert!(!format!("{mailbox:?}").contains("anon-key"));
    }

    #[test]
    fn test_otp_request_body() {
        let body = serde_json::to_value(OtpRequest {
            email: "kari@example.no",
            create_user: true,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "email": "kari@example.no", "create_user": true })
        );
    }
}
