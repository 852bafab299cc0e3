pub mod postgres;

pub use postgres::PgStorage;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Item, ItemUpdate, NewItem, NewUser, User};

/// Typed storage interface consumed by the HTTP layer.
///
/// Lookups report a missing row as `Ok(None)`, never as an error. Every
/// method is a single statement against the pool; there is no in-process
/// locking and no cross-statement transaction.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Inserts a new user. A duplicate username surfaces as
    /// [`AppError::Conflict`](crate::AppError::Conflict).
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    /// Inserts a new item with a generated short code, zero scan count and
    /// `is_active = true`. Regenerates the code on a collision.
    async fn create_item(&self, item: NewItem) -> AppResult<Item>;

    async fn get_item(&self, id: i64) -> AppResult<Option<Item>>;

    async fn get_item_by_qr_code(&self, qr_code_id: &str) -> AppResult<Option<Item>>;

    /// All items belonging to `user_id`, oldest first.
    async fn list_items_by_user(&self, user_id: i64) -> AppResult<Vec<Item>>;

    /// Applies a partial update in one statement; `Ok(None)` if the item
    /// does not exist.
    async fn update_item(&self, id: i64, update: ItemUpdate) -> AppResult<Option<Item>>;

    /// Returns true iff a row was actually deleted.
    async fn delete_item(&self, id: i64) -> AppResult<bool>;

    /// Atomically bumps the scan counter and stamps `last_scanned_at`,
    /// server-side. Safe under concurrent scans of the same item.
    async fn increment_scan_count(&self, id: i64) -> AppResult<Option<Item>>;
}
