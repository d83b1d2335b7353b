//! Posts: feed and explore queries, likes, saves and comments.

pub mod db;
pub mod handlers;
