//! Once-a-minute reminder sweep.

use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use tokio::time::MissedTickBehavior;

use crate::db;
use crate::error::AppResult;
use crate::models::user::User;
use crate::AppState;

const REMINDER_TEXT: &str = "👋 Hey! How's your vibe today? Let's log it: /log";

pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        // minutes lost while stalled are gone, no backfill
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = send_due_reminders(&state, Utc::now()).await {
                tracing::error!(error = %e, "Reminder sweep failed");
            }
        }
    });
}

/// One sweep: every enabled user whose morning or evening time matches the
/// current minute on their local clock gets a single nudge. Delivery
/// failures are logged per user and never abort the sweep.
pub async fn send_due_reminders(state: &AppState, now: DateTime<Utc>) -> AppResult<()> {
    let users = db::users::with_reminders_enabled(&state.db).await?;
    for user in &users {
        if user.timezone.parse::<Tz>().is_err() {
            tracing::warn!(
                telegram_id = user.telegram_id,
                timezone = %user.timezone,
                "Stored timezone no longer parses, treating as UTC"
            );
        }
        if !due_reminder(user, now) {
            continue;
        }
        if let Err(e) = state.api.send_message(user.telegram_id, REMINDER_TEXT, None).await {
            tracing::warn!(
                telegram_id = user.telegram_id,
                error = %e,
                "Failed to deliver reminder"
            );
        }
    }
    Ok(())
}

/// True when either trigger matches the current local hour and minute.
/// A user with both triggers on the same minute still gets one nudge.
pub fn due_reminder(user: &User, now: DateTime<Utc>) -> bool {
    let local = now.with_timezone(&user.tz());
    let (hour, minute) = (local.hour(), local.minute());

    if let Some(morning) = user.morning_time {
        if morning.hour() == hour && morning.minute() == minute {
            return true;
        }
    }
    if let Some(evening) = user.evening_time {
        if evening.hour() == hour && evening.minute() == minute {
            return true;
        }
    }
    false
}

// ── Tests ────────────────────────────────────────────────────────────
