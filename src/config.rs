use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        Self::from_values(
            env::var("DATABASE_URL").ok(),
            env::var("DATABASE_MAX_CONNECTIONS").ok(),
            env::var("SESSION_TTL_SECS").ok(),
        )
    }

    /// Builds a config from raw (env-shaped) values. Unset or unparsable
    /// extras fall back to defaults; only the database URL is required.
    fn from_values(
        database_url: Option<String>,
        max_connections: Option<String>,
        session_ttl_secs: Option<String>,
    ) -> AppResult<Self> {
        let database_url =
            database_url.ok_or_else(|| AppError::Config("DATABASE_URL is not set".to_string()))?;

        Ok(Config {
            database_url,
            max_connections: max_connections
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            session_ttl: Duration::from_secs(
                session_ttl_secs
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            ),
        })
    }
}
