use chrono::NaiveDateTime;
use sqlx::FromRow;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 10;

#[derive(Debug, Clone, FromRow)]
pub struct MoodLog {
    pub id: String,
    pub user_id: String,
    pub rating: i64,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}
