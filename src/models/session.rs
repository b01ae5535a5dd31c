use sqlx::FromRow;

/// Conversation state for one user in one chat, persisted so an
/// in-progress dialog survives a process restart. Keyed per user so
/// group members never share a dialog.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub chat_id: i64,
    pub user_id: i64,
    pub state: String,
    pub pending_rating: Option<i64>,
    pub chart_in_flight: bool,
}

impl Session {
    pub fn state(&self) -> SessionState {
        SessionState::from_parts(&self.state, self.pending_rating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingNote { rating: i64 },
    AwaitingMorningTime,
    AwaitingEveningTime,
    AwaitingTimezone,
}

impl SessionState {
    /// Splits the state into the stored (tag, pending_rating) column pair.
    pub fn as_parts(&self) -> (&'static str, Option<i64>) {
        match self {
            SessionState::Idle => ("idle", None),
            SessionState::AwaitingNote { rating } => ("awaiting_note", Some(*rating)),
            SessionState::AwaitingMorningTime => ("awaiting_morning_time", None),
            SessionState::AwaitingEveningTime => ("awaiting_evening_time", None),
            SessionState::AwaitingTimezone => ("awaiting_timezone", None),
        }
    }

    pub fn from_parts(tag: &str, pending_rating: Option<i64>) -> Self {
        match tag {
            "idle" => SessionState::Idle,
            "awaiting_note" => match pending_rating {
                Some(rating) => SessionState::AwaitingNote { rating },
                None => {
                    tracing::warn!("awaiting_note session without a pending rating, resetting");
                    SessionState::Idle
                }
            },
            "awaiting_morning_time" => SessionState::AwaitingMorningTime,
            "awaiting_evening_time" => SessionState::AwaitingEveningTime,
            "awaiting_timezone" => SessionState::AwaitingTimezone,
            other => {
                tracing::warn!(state = other, "Unknown session state, resetting to idle");
                SessionState::Idle
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_parts() {
        let states = [
            SessionState::Idle,
            SessionState::AwaitingNote { rating: 7 },
            SessionState::AwaitingMorningTime,
            SessionState::AwaitingEveningTime,
            SessionState::AwaitingTimezone,
        ];
        for state in states {
            let (tag, rating) = state.as_parts();
            assert_eq!(SessionState::from_parts(tag, rating), state);
        }
    }

    #[test]
    fn unknown_tag_resets_to_idle() {
        assert_eq!(SessionState::from_parts("waiting_for_elvis", None), SessionState::Idle);
    }

    #[test]
    fn note_state_without_rating_resets_to_idle() {
        assert_eq!(SessionState::from_parts("awaiting_note", None), SessionState::Idle);
    }
}
