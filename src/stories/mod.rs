//! Ephemeral 24-hour stories.
//!
//! A story is Active from creation until `expires_at`, then Expired.
//! Expired means absent: every read filters on the expiry timestamp, and
//! the [`sweeper`] physically removes expired rows in the background.

pub mod db;
pub mod groups;
pub mod handlers;
pub mod sweeper;
