use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::session::{Session, SessionState};

/// Missing row reads as `Idle` so new chats need no setup.
pub async fn get_state(pool: &SqlitePool, chat_id: i64, user_id: i64) -> AppResult<SessionState> {
    let session =
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE chat_id = ? AND user_id = ?")
            .bind(chat_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(session.map(|s| s.state()).unwrap_or(SessionState::Idle))
}

pub async fn set_state(
    pool: &SqlitePool,
    chat_id: i64,
    user_id: i64,
    state: &SessionState,
) -> AppResult<()> {
    let (tag, pending_rating) = state.as_parts();
    sqlx::query(
        "INSERT INTO sessions (chat_id, user_id, state, pending_rating, updated_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(chat_id, user_id) DO UPDATE SET
             state = excluded.state,
             pending_rating = excluded.pending_rating,
             updated_at = excluded.updated_at",
    )
    .bind(chat_id)
    .bind(user_id)
    .bind(tag)
    .bind(pending_rating)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn clear(pool: &SqlitePool, chat_id: i64, user_id: i64) -> AppResult<()> {
    set_state(pool, chat_id, user_id, &SessionState::Idle).await
}

/// Atomically flips the chart flag on. Returns false when a render is
/// already in flight for this user, in which case the caller must back off.
pub async fn try_claim_chart(pool: &SqlitePool, chat_id: i64, user_id: i64) -> AppResult<bool> {
    let result = sqlx::query(
        "INSERT INTO sessions (chat_id, user_id, chart_in_flight, updated_at)
         VALUES (?, ?, 1, ?)
         ON CONFLICT(chat_id, user_id) DO UPDATE SET
             chart_in_flight = 1,
             updated_at = excluded.updated_at
         WHERE sessions.chart_in_flight = 0",
    )
    .bind(chat_id)
    .bind(user_id)
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn release_chart(pool: &SqlitePool, chat_id: i64, user_id: i64) -> AppResult<()> {
    sqlx::query(
        "UPDATE sessions SET chart_in_flight = 0, updated_at = ? WHERE chat_id = ? AND user_id = ?",
    )
    .bind(Utc::now().naive_utc())
    .bind(chat_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Drops every chart flag. Run once at boot: a crash mid-render leaves the
/// flag set, which would silently swallow that user's chart requests forever.
pub async fn reset_chart_claims(pool: &SqlitePool) -> AppResult<u64> {
    let result = sqlx::query("UPDATE sessions SET chart_in_flight = 0 WHERE chart_in_flight = 1")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ── Tests ────────────────────────────────────────────────────────────
