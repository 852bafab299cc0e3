use async_trait::async_trait;
use sqlx::PgPool;

use crate::code::generate_qr_code_id;
use crate::config::Config;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{Item, ItemUpdate, NewItem, NewUser, User};
use crate::session::PgSessionStore;
use crate::storage::Storage;

/// How many short codes we try before giving up on an insert.
const MAX_CODE_ATTEMPTS: u32 = 5;

const ITEM_COLUMNS: &str =
    "id, user_id, name, description, qr_code_id, scan_count, last_scanned_at, created_at, is_active";

/// Postgres-backed storage handle. Cheap to clone; pass it to whatever
/// consumes it instead of holding a process-wide global.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds the pool from config and ensures the schema exists.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let pool = db::create_pool(&config.database_url, config.max_connections).await?;
        db::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Session store sharing this handle's connection pool.
    pub fn session_store(&self, config: &Config) -> PgSessionStore {
        PgSessionStore::new(self.pool.clone(), config.session_ttl)
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password) VALUES ($1, $2) \
             RETURNING id, username, password, created_at",
        )
        .bind(&user.username)
        .bind(&user.password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if AppError::is_unique_violation(&e) {
                AppError::Conflict(format!("username '{}' already exists", user.username))
            } else {
                AppError::Database(e)
            }
        })?;

        tracing::info!(user_id = created.id, username = %created.username, "Created user");
        Ok(created)
    }

    async fn create_item(&self, item: NewItem) -> AppResult<Item> {
        let sql = format!(
            "INSERT INTO items (user_id, name, description, qr_code_id) \
             VALUES ($1, $2, $3, $4) RETURNING {ITEM_COLUMNS}"
        );

        // qr_code_id carries a unique constraint; on the (rare) collision
        // we draw a fresh code and retry.
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let qr_code_id = generate_qr_code_id();

            let result = sqlx::query_as::<_, Item>(&sql)
                .bind(item.user_id)
                .bind(&item.name)
                .bind(item.description.as_deref())
                .bind(&qr_code_id)
                .fetch_one(&self.pool)
                .await;

            match result {
                Ok(created) => {
                    tracing::info!(
                        item_id = created.id,
                        qr_code_id = %created.qr_code_id,
                        "Created item"
                    );
                    return Ok(created);
                }
                Err(e) if AppError::is_unique_violation(&e) => {
                    tracing::warn!(attempt, qr_code_id = %qr_code_id, "Short code collision");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(format!(
            "could not generate a unique QR code id after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    async fn get_item(&self, id: i64) -> AppResult<Option<Item>> {
        let item =
            sqlx::query_as::<_, Item>(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(item)
    }

    async fn get_item_by_qr_code(&self, qr_code_id: &str) -> AppResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE qr_code_id = $1"
        ))
        .bind(qr_code_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn list_items_by_user(&self, user_id: i64) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE user_id = $1 ORDER BY id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn update_item(&self, id: i64, update: ItemUpdate) -> AppResult<Option<Item>> {
        if update.is_noop() {
            return self.get_item(id).await;
        }

        // $4 tells the statement whether to touch description at all, so a
        // patch can also clear it to NULL.
        let item = sqlx::query_as::<_, Item>(&format!(
            "UPDATE items SET \
             name = COALESCE($2::text, name), \
             description = CASE WHEN $3 THEN $4::text ELSE description END, \
             is_active = COALESCE($5::boolean, is_active) \
             WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.description.is_some())
        .bind(update.description.as_ref().and_then(|d| d.as_deref()))
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await?;

        if item.is_some() {
            tracing::info!(item_id = id, "Updated item");
        }
        Ok(item)
    }

    async fn delete_item(&self, id: i64) -> AppResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected > 0 {
            tracing::info!(item_id = id, "Deleted item");
        }
        Ok(rows_affected > 0)
    }

    async fn increment_scan_count(&self, id: i64) -> AppResult<Option<Item>> {
        // Single server-side statement: concurrent scans cannot lose counts.
        let item = sqlx::query_as::<_, Item>(&format!(
            "UPDATE items SET scan_count = scan_count + 1, last_scanned_at = NOW() \
             WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref scanned) = item {
            tracing::debug!(item_id = id, scan_count = scanned.scan_count, "Recorded scan");
        }
        Ok(item)
    }
}
