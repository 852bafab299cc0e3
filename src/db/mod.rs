pub mod migrate;
pub mod pool;

pub use migrate::migrate;
pub use pool::create_pool;
