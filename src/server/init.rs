//! Application startup.
//!
//! Connects to Postgres, runs embedded migrations, prepares the upload
//! directory, spawns the story expiry sweeper and builds the router.

use axum::Router;
use sqlx::PgPool;
use thiserror::Error;

use crate::routes::create_router;
use crate::server::config::ServerConfig;
use crate::server::state::AppState;
use crate::stories::sweeper;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("failed to prepare upload directory: {0}")]
    UploadDir(#[from] std::io::Error),
}

/// Build the Axum application.
///
/// # Errors
///
/// Fails when the database is unreachable, migrations cannot be applied,
/// or the upload directory cannot be created. Unlike softer services, this
/// API is useless without its database, so startup is fail-fast.
pub async fn create_app(config: ServerConfig) -> Result<Router, InitError> {
    tracing::info!("Connecting to database");
    let pool = PgPool::connect(&config.database_url).await?;

    tracing::info!("Running database migrations");
    sqlx::migrate!().run(&pool).await?;

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Expired stories are physically removed off the request path; reads
    // independently filter on expires_at so visibility never depends on
    // the sweep having run.
    sweeper::spawn(pool.clone());

    let state = AppState::new(pool, config);
    tracing::info!("Router configured");
    Ok(create_router(state))
}
