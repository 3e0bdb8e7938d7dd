//! # idgate-oidc
//!
//! OpenID Connect authorization-code flow against national eID providers.
//!
//! - Provider configuration (Vipps Login, Criipto Verify)
//! - Discovery document and JWKS caching with a bounded TTL
//! - Authorization URL construction with `state` and `nonce`
//! - Code exchange, ID token validation (RS256, iss, aud, exp, nonce)
//! - Userinfo fallback and claim normalization
//!
//! # Security
//! Access and ID tokens are used within a single callback and never
//! persisted. The national identity number leaves this crate only inside
//! [`NormalizedClaims`], whose `Debug` output redacts it.

#![warn(clippy::all)]

pub mod authorize;
pub mod claims;
pub mod client;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod flow;
pub mod types;
pub mod validation;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use authorize::build_authorization_url;
pub use claims::{resolve_claims, NormalizedClaims};
pub use client::{ProviderHttp, ReqwestProviderHttp};
pub use config::{ClaimsSource, Provider, ProviderConfig, ProviderSettings, TokenAuthMethod};
pub use discovery::{DiscoveryCache, DEFAULT_DISCOVERY_TTL_SECS};
pub use errors::{FailureReason, OidcError, Result};
pub use flow::{AuthorizationStart, CallbackParams, ExpectedHandshake, OidcClient};
pub use types::{CacheEntry, IdTokenClaims, JwksKey, JwksKeySet, OidcConfiguration, TokenResponse};
pub use validation::validate_id_token;
