pub mod mood_logs;
pub mod pool;
pub mod sessions;
pub mod users;

pub use pool::create_pool;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
