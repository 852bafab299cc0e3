use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

use crate::error::AppResult;
use crate::session::SessionStore;

/// Session store backed by the sessions table in the application database.
/// Shares the pool with [`PgStorage`](crate::PgStorage).
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    ttl: Duration,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    fn ttl_secs(&self) -> f64 {
        self.ttl.as_secs_f64()
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, sid: &str) -> AppResult<Option<serde_json::Value>> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            "SELECT data FROM sessions WHERE sid = $1 AND expires_at > NOW()",
        )
        .bind(sid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(data,)| data))
    }

    async fn set(&self, sid: &str, data: serde_json::Value) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions (sid, data, expires_at) \
             VALUES ($1, $2, NOW() + $3 * INTERVAL '1 second') \
             ON CONFLICT (sid) DO UPDATE \
             SET data = EXCLUDED.data, expires_at = EXCLUDED.expires_at",
        )
        .bind(sid)
        .bind(data)
        .bind(self.ttl_secs())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn touch(&self, sid: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE sessions SET expires_at = NOW() + $2 * INTERVAL '1 second' \
             WHERE sid = $1 AND expires_at > NOW()",
        )
        .bind(sid)
        .bind(self.ttl_secs())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE sid = $1")
            .bind(sid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> AppResult<u64> {
        let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();

        if purged > 0 {
            tracing::debug!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
