pub mod mood_log;
pub mod session;
pub mod user;
