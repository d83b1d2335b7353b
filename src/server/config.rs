//! Server configuration.
//!
//! Everything is read from the environment once at startup (a `.env` file
//! is honored via `dotenv` in `main`). The database is mandatory; the JWT
//! secret falls back to a development value with a loud warning.

use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_PORT: u16 = 3001;
const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set")]
    MissingDatabaseUrl,
}

/// Runtime configuration collected from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP server binds to (`SERVER_PORT`, default 3001).
    pub port: u16,
    /// Postgres connection string (`DATABASE_URL`, required).
    pub database_url: String,
    /// HMAC secret for session tokens (`JWT_SECRET`).
    pub jwt_secret: String,
    /// Directory uploaded media is written to (`UPLOAD_DIR`, default `uploads`).
    pub upload_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using development secret");
            DEV_JWT_SECRET.to_string()
        });

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        Ok(Self {
            port: parse_port(std::env::var("SERVER_PORT").ok()),
            database_url,
            jwt_secret,
            upload_dir,
        })
    }
}

fn parse_port(raw: Option<String>) -> u16 {
    raw.and_then(|p| p.parse().ok()).unwrap_or(DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_when_unset_or_invalid() {
        assert_eq!(parse_port(None), DEFAULT_PORT);
        assert_eq!(parse_port(Some("not-a-port".into())), DEFAULT_PORT);
        assert_eq!(parse_port(Some("8080".into())), 8080);
    }
}
