pub mod code;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use session::{PgSessionStore, SessionStore};
pub use storage::{PgStorage, Storage};
