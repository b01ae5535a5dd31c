use sqlx::SqlitePool;

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod telegram;

use config::Config;
use telegram::api::TelegramApi;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub api: TelegramApi,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibetrack_bot=info,sqlx=warn".into()),
        )
        .json()
        .init();

    let config = Config::from_env();

    // Database
    let db = db::create_pool(&config.database_url).await;

    db::MIGRATOR
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    // A crash mid-render leaves chart flags set, blocking those users forever.
    let stale = db::sessions::reset_chart_claims(&db)
        .await
        .expect("Failed to reset chart flags");
    if stale > 0 {
        tracing::warn!(stale, "Cleared chart flags left over from a previous run");
    }

    let api = TelegramApi::new(&config.telegram_api_url, &config.bot_token);
    let state = AppState { db, api };

    if let Err(e) = state.api.set_my_commands(&handlers::bot_commands()).await {
        tracing::warn!(error = %e, "Failed to register bot commands");
    }

    // Start the reminder sweep (checks due triggers every minute)
    services::scheduler::spawn(state.clone());

    tracing::info!("Polling for updates");
    run_polling(state, config.poll_timeout_secs).await;
}

async fn run_polling(state: AppState, poll_timeout_secs: u64) {
    let mut offset: i64 = 0;
    loop {
        match state.api.get_updates(offset, poll_timeout_secs).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let state = state.clone();
                    tokio::spawn(async move {
                        handlers::dispatch_update(&state, update).await;
                    });
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "getUpdates failed, backing off");
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            }
        }
    }
}
