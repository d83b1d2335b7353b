//! Cross-cutting request middleware.

pub mod auth;
