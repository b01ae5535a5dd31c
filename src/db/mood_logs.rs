use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::mood_log::{MoodLog, MAX_RATING, MIN_RATING};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

pub async fn create(
    pool: &SqlitePool,
    user_id: &str,
    rating: i64,
    note: Option<&str>,
) -> AppResult<MoodLog> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::Validation(format!(
            "rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    let log = sqlx::query_as::<_, MoodLog>(
        "INSERT INTO mood_logs (id, user_id, rating, note, created_at) VALUES (?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(rating)
    .bind(note)
    .bind(Utc::now().naive_utc())
    .fetch_one(pool)
    .await?;
    Ok(log)
}

/// All logs at or after `since` (UTC wall clock), oldest or newest first.
pub async fn for_user_since(
    pool: &SqlitePool,
    user_id: &str,
    since: NaiveDateTime,
    order: SortOrder,
) -> AppResult<Vec<MoodLog>> {
    let sql = match order {
        SortOrder::Asc => {
            "SELECT * FROM mood_logs WHERE user_id = ? AND created_at >= ?
             ORDER BY created_at ASC"
        }
        SortOrder::Desc => {
            "SELECT * FROM mood_logs WHERE user_id = ? AND created_at >= ?
             ORDER BY created_at DESC"
        }
    };
    let logs = sqlx::query_as::<_, MoodLog>(sql)
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await?;
    Ok(logs)
}

// ── Tests ────────────────────────────────────────────────────────────
