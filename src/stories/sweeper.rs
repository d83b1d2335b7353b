//! Background removal of expired stories.
//!
//! Runs on its own tokio task, decoupled from request handling. Reads
//! never rely on this having run: the expiry filter in `stories::db` is
//! what makes an expired story unreachable.

use std::time::Duration;

use sqlx::PgPool;

use crate::stories::db::delete_expired;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the periodic expiry sweep.
pub fn spawn(pool: PgPool) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match delete_expired(&pool).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "swept expired stories"),
                Err(e) => tracing::warn!("story sweep failed: {e}"),
            }
        }
    });
}
