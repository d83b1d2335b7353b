//! Profiles, avatars and the follow graph.

pub mod db;
pub mod handlers;
