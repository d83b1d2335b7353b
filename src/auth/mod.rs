//! Registration, login and session tokens.

pub mod handlers;
pub mod sessions;
