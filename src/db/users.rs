use chrono::{NaiveTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::user::User;

pub async fn find_by_telegram_id(pool: &SqlitePool, telegram_id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE telegram_id = ?")
        .bind(telegram_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Looks a user up by Telegram id, creating the row on first contact.
/// Keeps the stored username in sync with what Telegram reports.
pub async fn get_or_create(
    pool: &SqlitePool,
    telegram_id: i64,
    username: Option<&str>,
) -> AppResult<User> {
    if let Some(user) = find_by_telegram_id(pool, telegram_id).await? {
        if user.username.as_deref() != username {
            return set_username(pool, &user.id, username).await;
        }
        return Ok(user);
    }

    sqlx::query(
        "INSERT INTO users (id, telegram_id, username, created_at) VALUES (?, ?, ?, ?)
         ON CONFLICT(telegram_id) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(telegram_id)
    .bind(username)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;

    find_by_telegram_id(pool, telegram_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {telegram_id} missing after insert")))
}

async fn set_username(pool: &SqlitePool, id: &str, username: Option<&str>) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>("UPDATE users SET username = ? WHERE id = ? RETURNING *")
        .bind(username)
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(user)
}

pub async fn set_timezone(pool: &SqlitePool, id: &str, timezone: &str) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>("UPDATE users SET timezone = ? WHERE id = ? RETURNING *")
        .bind(timezone)
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(user)
}

pub async fn set_reminders_enabled(pool: &SqlitePool, id: &str, enabled: bool) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET reminders_enabled = ? WHERE id = ? RETURNING *",
    )
    .bind(enabled)
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn set_morning_time(pool: &SqlitePool, id: &str, time: NaiveTime) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET morning_time = ? WHERE id = ? RETURNING *",
    )
    .bind(time)
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn set_evening_time(pool: &SqlitePool, id: &str, time: NaiveTime) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET evening_time = ? WHERE id = ? RETURNING *",
    )
    .bind(time)
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn with_reminders_enabled(pool: &SqlitePool) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE reminders_enabled = 1")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

// ── Tests ────────────────────────────────────────────────────────────
