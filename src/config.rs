use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,

    /// Base URL of the Bot API. Only overridden in tests.
    pub telegram_api_url: String,

    pub poll_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN must be set"),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:vibetrack.db".into()),
            telegram_api_url: env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".into()),
            poll_timeout_secs: env::var("POLL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .expect("POLL_TIMEOUT_SECS must be a number"),
        }
    }
}
