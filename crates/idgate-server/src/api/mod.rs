pub mod email;
pub mod health;
pub mod helpers;
pub mod identity;
pub mod session;
