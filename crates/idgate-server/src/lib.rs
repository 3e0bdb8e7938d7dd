//! # idgate-server
//!
//! HTTP surface for national eID verification (Vipps Login, Criipto Verify)
//! and magic-link email sessions. Issues the encrypted `identity_session`
//! cookie and the signed `email_session` cookie.

pub mod api;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extractors;
pub mod mailbox;
pub mod middleware;
pub mod request_context;
pub mod routes;
pub mod state;

pub use config::Config;
pub use mailbox::{GoTrueMailbox, MailboxBackend, MailboxError};
pub use routes::create_router;
pub use state::AppState;
