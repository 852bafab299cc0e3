pub mod postgres;

pub use postgres::PgSessionStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::AppResult;

/// Key-value session persistence for the web layer's session middleware.
///
/// Payloads are opaque JSON; expiry is enforced by the store, so an expired
/// session reads back as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Live session payload, or `None` if missing or expired.
    async fn get(&self, sid: &str) -> AppResult<Option<serde_json::Value>>;

    /// Upserts the payload and refreshes expiry to now + TTL.
    async fn set(&self, sid: &str, data: serde_json::Value) -> AppResult<()>;

    /// Extends expiry of a live session; does nothing if the session is gone.
    async fn touch(&self, sid: &str) -> AppResult<()>;

    async fn destroy(&self, sid: &str) -> AppResult<()>;

    /// Removes expired rows, returning how many were deleted.
    async fn purge_expired(&self) -> AppResult<u64>;

    fn ttl(&self) -> Duration;
}
