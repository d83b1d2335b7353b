//! Photogram - photo-sharing social network REST API
//!
//! This library implements the backend for a small social network: user
//! accounts and follow relationships, image posts with likes, saves and
//! comments, and ephemeral 24-hour stories.
//!
//! # Module Structure
//!
//! - **`server`** - Configuration, shared state and application assembly
//! - **`routes`** - Axum router wiring for the `/api` surface
//! - **`middleware`** - Bearer-token authentication (required and optional)
//! - **`auth`** - Registration, login and JWT session tokens
//! - **`users`** - Profiles, avatars, the follow graph and suggestions
//! - **`posts`** - Feed and explore queries, engagement and comments
//! - **`stories`** - Ephemeral stories, grouping and the expiry sweeper
//! - **`media`** - Multipart upload handling for images and videos
//! - **`error`** - The `ApiError` taxonomy and HTTP mapping
//! - **`response`** - The `{success, data, message, pagination}` envelope

pub mod auth;
pub mod error;
pub mod media;
pub mod middleware;
pub mod posts;
pub mod response;
pub mod routes;
pub mod server;
pub mod stories;
pub mod users;
