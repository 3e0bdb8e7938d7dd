//! Common test utilities for server integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestResponse, TestServer};
use idgate_server::{create_router, AppState, Config, MailboxBackend, MailboxError};
use tower_cookies::Cookie;

pub use idgate_oidc::testing::{
    id_token_claims, sign, MockProviderHttp, CLIENT_ID, ISSUER, NATIONAL_ID,
};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const HOST: &str = "app.example.no";
pub const ORIGIN: &str = "https://app.example.no";

/// Mock magic-link backend that captures sent links
#[derive(Default, Clone)]
pub struct MockMailbox {
    /// Captured (email, redirect_to) pairs
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
    /// Access token -> email
    pub tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl MockMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue_token(&self, token: &str, email: &str) {
        self.tokens
            .write()
            .unwrap()
            .insert(token.to_string(), email.to_string());
    }

    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }

    pub fn last_sent(&self) -> Option<(String, String)> {
        self.sent.read().unwrap().last().cloned()
    }
}

#[async_trait]
impl MailboxBackend for MockMailbox {
    async fn send_magic_link(&self, email: &str, redirect_to: &str) -> Result<(), MailboxError> {
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn verify_access_token(&self, access_token: &str) -> Result<String, MailboxError> {
        self.tokens
            .read()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or(MailboxError::Rejected)
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub provider: Arc<MockProviderHttp>,
    pub mailbox: MockMailbox,
}

const BASE_SETTINGS: &[(&str, &str)] = &[
    ("SESSION_SECRET", TEST_SECRET),
    ("DEFAULT_FLOW", "verify"),
    ("VIPPS_CLIENT_ID", CLIENT_ID),
    ("VIPPS_CLIENT_SECRET", "vipps-secret"),
    ("VIPPS_SUBSCRIPTION_KEY", "subscription-key"),
    ("VIPPS_MERCHANT_SERIAL_NUMBER", "123456"),
    ("CRIIPTO_DOMAIN", "idp.test"),
    ("CRIIPTO_CLIENT_ID", CLIENT_ID),
    ("CRIIPTO_CLIENT_SECRET", "criipto-secret"),
];

/// Config from the base settings, with `overrides` applied and `removed` keys dropped
pub fn test_config(overrides: &[(&str, &str)], removed: &[&str]) -> Config {
    let mut settings: HashMap<String, String> = BASE_SETTINGS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (k, v) in overrides {
        settings.insert(k.to_string(), v.to_string());
    }
    for k in removed {
        settings.remove(*k);
    }
    Config::from_lookup(|key| settings.get(key).cloned()).unwrap()
}

pub fn build_app(config: Config, with_mailbox: bool) -> TestApp {
    let provider = Arc::new(MockProviderHttp::new());
    let mailbox = MockMailbox::new();
    let backend: Option<Arc<dyn MailboxBackend>> = if with_mailbox {
        Some(Arc::new(mailbox.clone()))
    } else {
        None
    };

    let state = Arc::new(AppState::new(config, provider.clone(), backend).unwrap());
    let server = TestServer::new(create_router(state)).expect("Failed to create test server");

    TestApp {
        server,
        provider,
        mailbox,
    }
}

/// Both providers and the mailbox configured
pub fn test_app() -> TestApp {
    build_app(test_config(&[], &[]), true)
}

/// Send the browser-facing `Host` header
pub fn with_host(request: TestRequest) -> TestRequest {
    request.add_header(
        HeaderName::from_static("host"),
        HeaderValue::from_static(HOST),
    )
}

pub fn location(response: &TestResponse) -> String {
    response
        .headers()
        .get("location")
        .expect("No Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Query parameter of an absolute URL
pub fn query_param(location: &str, name: &str) -> Option<String> {
    url::Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// The three handshake cookies set by a start response
pub fn handshake_cookies(response: &TestResponse, provider: &str) -> Vec<Cookie<'static>> {
    ["state", "nonce", "intent"]
        .iter()
        .map(|suffix| {
            response
                .maybe_cookie(&format!("{provider}_{suffix}"))
                .unwrap_or_else(|| panic!("No {provider}_{suffix} cookie"))
        })
        .collect()
}

/// Result of `GET /api/auth/:provider/start`
pub struct StartedFlow {
    pub location: String,
    pub state: String,
    pub nonce: String,
    pub cookies: Vec<Cookie<'static>>,
}

pub async fn start_flow(app: &TestApp, provider: &str, query: &str) -> StartedFlow {
    let response = with_host(
        app.server
            .get(&format!("/api/auth/{provider}/start{query}")),
    )
    .await;
    assert_eq!(response.status_code(), 303);

    let location = location(&response);
    let state = query_param(&location, "state").expect("No state in authorization URL");
    let nonce = query_param(&location, "nonce").expect("No nonce in authorization URL");

    StartedFlow {
        cookies: handshake_cookies(&response, provider),
        location,
        state,
        nonce,
    }
}

pub async fn callback(
    app: &TestApp,
    provider: &str,
    query: &str,
    cookies: &[Cookie<'static>],
) -> TestResponse {
    let mut request = with_host(
        app.server
            .get(&format!("/api/auth/{provider}/callback{query}")),
    );
    for cookie in cookies {
        request = request.add_cookie(cookie.clone());
    }
    request.await
}
