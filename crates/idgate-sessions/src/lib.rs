pub mod constants;
pub mod email;
pub mod errors;
pub mod handshake;
mod sealer;
pub mod types;


pub use constants::*;
pub use email::{normalize_email, EmailSession};
pub use errors::*;
pub use handshake::{FlowIntent, HandshakeContext};
pub use sealer::SessionSealer;
pub use types::*;
