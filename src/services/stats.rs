use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db;
use crate::db::mood_logs::SortOrder;
use crate::error::AppResult;
use crate::models::mood_log::MoodLog;
use crate::services::timewindow::TimeWindow;

/// Aggregate over a user's last seven days of logs.
#[derive(Debug, Clone)]
pub struct MoodStats {
    pub count: usize,
    /// Mean rating, rounded half-up to one decimal.
    pub average: f64,
    pub best: Option<MoodLog>,
    pub worst: Option<MoodLog>,
}

impl MoodStats {
    /// Expects logs newest first; on rating ties the most recent log wins.
    pub fn from_logs(logs: &[MoodLog]) -> Self {
        if logs.is_empty() {
            return Self {
                count: 0,
                average: 0.0,
                best: None,
                worst: None,
            };
        }

        let sum: i64 = logs.iter().map(|log| log.rating).sum();
        let average = round1(sum as f64 / logs.len() as f64);

        let top = logs.iter().map(|log| log.rating).max().unwrap_or(0);
        let low = logs.iter().map(|log| log.rating).min().unwrap_or(0);
        let best = logs.iter().find(|log| log.rating == top).cloned();
        let worst = logs.iter().find(|log| log.rating == low).cloned();

        Self {
            count: logs.len(),
            average,
            best,
            worst,
        }
    }
}

/// Stats over the trailing seven days. `None` when the Telegram id is
/// unknown, zeroed stats when the user exists but has no logs in range.
pub async fn weekly_stats(
    pool: &SqlitePool,
    telegram_id: i64,
    now: DateTime<Utc>,
) -> AppResult<Option<MoodStats>> {
    let Some(user) = db::users::find_by_telegram_id(pool, telegram_id).await? else {
        return Ok(None);
    };
    // same window the chart uses, so the two never drift apart
    let since = TimeWindow::Week.start_utc(user.tz(), now).naive_utc();
    let logs = db::mood_logs::for_user_since(pool, &user.id, since, SortOrder::Desc).await?;
    Ok(Some(MoodStats::from_logs(&logs)))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ── Tests ────────────────────────────────────────────────────────────
