use chrono::{NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub created_at: NaiveDateTime,
    pub reminders_enabled: bool,
    pub morning_time: Option<NaiveTime>,
    pub evening_time: Option<NaiveTime>,
    pub timezone: String,
}

impl User {
    /// Parses the stored timezone, falling back to UTC on a stale or
    /// unrecognized name.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
