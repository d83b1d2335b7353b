//! Shared application state.
//!
//! Handlers receive [`AppState`] through axum's `State` extractor. The
//! connection pool is the only suspension point in the system; there is no
//! application-level locking or in-memory cache.

use std::sync::Arc;

use sqlx::PgPool;

use crate::server::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pool: PgPool, config: ServerConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}
