use std::time::Instant;

use crate::db;
use crate::error::AppResult;
use crate::handlers::reminders::{self, ReminderSlot};
use crate::handlers::tracking;
use crate::models::mood_log::{MAX_RATING, MIN_RATING};
use crate::models::session::SessionState;
use crate::models::user::User;
use crate::services::timewindow::TimeWindow;
use crate::telegram::types::{BotCommand, CallbackQuery, Message, TgUser, Update};
use crate::AppState;

/// Entry point for every polled update. Failures are logged, never
/// propagated, so one broken update cannot take the loop down.
pub async fn dispatch_update(state: &AppState, update: Update) {
    let started = Instant::now();
    let update_id = update.update_id;

    let result = route(state, &update).await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    if elapsed_ms > 1_000 {
        tracing::warn!(update_id, elapsed_ms, "Slow update");
    } else {
        tracing::debug!(update_id, elapsed_ms, "Handled update");
    }
    if let Err(e) = result {
        tracing::error!(update_id, error = %e, "Update handling failed");
    }
}

async fn route(state: &AppState, update: &Update) -> AppResult<()> {
    if let Some(message) = &update.message {
        return handle_message(state, message).await;
    }
    if let Some(callback) = &update.callback_query {
        return handle_callback(state, callback).await;
    }
    Ok(())
}

async fn handle_message(state: &AppState, message: &Message) -> AppResult<()> {
    let Some(from) = &message.from else {
        return Ok(());
    };
    let Some(text) = message.text.as_deref() else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let text = text.trim();

    // Commands always win over whatever dialog is in progress.
    if let Some(rest) = text.strip_prefix('/') {
        let command = rest
            .split_whitespace()
            .next()
            .unwrap_or("")
            .split('@')
            .next()
            .unwrap_or("");
        return match command {
            "start" => tracking::cmd_start(state, chat_id, from).await,
            "log" => tracking::cmd_log(state, chat_id, from).await,
            "stats" => tracking::cmd_stats(state, chat_id, from).await,
            "moodchart" => tracking::cmd_moodchart(state, chat_id, from).await,
            "reminders" => reminders::cmd_reminders(state, chat_id, from).await,
            _ => Ok(()),
        };
    }

    match db::sessions::get_state(&state.db, chat_id, from.id).await? {
        SessionState::AwaitingNote { rating } => {
            tracking::process_note(state, chat_id, from, rating, text).await
        }
        SessionState::AwaitingMorningTime => {
            reminders::process_time_input(state, chat_id, from, text, ReminderSlot::Morning).await
        }
        SessionState::AwaitingEveningTime => {
            reminders::process_time_input(state, chat_id, from, text, ReminderSlot::Evening).await
        }
        SessionState::AwaitingTimezone => {
            reminders::process_timezone_input(state, chat_id, from, text).await
        }
        SessionState::Idle => Ok(()),
    }
}

async fn handle_callback(state: &AppState, callback: &CallbackQuery) -> AppResult<()> {
    // Ack first so the client stops its spinner even if handling fails.
    state.api.answer_callback_query(&callback.id).await?;

    let Some(data) = callback.data.as_deref() else {
        return Ok(());
    };
    let Some(message) = &callback.message else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let message_id = message.message_id;
    let from = &callback.from;

    match CallbackAction::parse(data) {
        CallbackAction::Rate(rating) => {
            tracking::rate(state, chat_id, message_id, from, rating).await
        }
        CallbackAction::SkipNote => tracking::skip_note(state, chat_id, message_id, from).await,
        CallbackAction::Chart(window) => {
            tracking::send_chart(state, chat_id, message_id, from, window).await
        }
        CallbackAction::OpenChartMenu => tracking::send_chart_menu(state, chat_id).await,
        CallbackAction::ToggleReminders => {
            reminders::toggle(state, chat_id, message_id, from).await
        }
        CallbackAction::SetMorning => {
            reminders::ask_time(state, chat_id, message_id, from, ReminderSlot::Morning).await
        }
        CallbackAction::SetEvening => {
            reminders::ask_time(state, chat_id, message_id, from, ReminderSlot::Evening).await
        }
        CallbackAction::SetTimezone => {
            reminders::ask_timezone(state, chat_id, message_id, from).await
        }
        CallbackAction::Unknown => {
            tracing::debug!(data, "Ignoring unknown callback payload");
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Rate(i64),
    SkipNote,
    ToggleReminders,
    SetMorning,
    SetEvening,
    SetTimezone,
    Chart(TimeWindow),
    OpenChartMenu,
    Unknown,
}

impl CallbackAction {
    /// Forged or stale payloads parse to `Unknown` and are dropped.
    pub fn parse(data: &str) -> Self {
        if let Some(value) = data.strip_prefix("rate:") {
            return match value.parse::<i64>() {
                Ok(n) if (MIN_RATING..=MAX_RATING).contains(&n) => CallbackAction::Rate(n),
                _ => CallbackAction::Unknown,
            };
        }
        if let Some(key) = data.strip_prefix("chart:") {
            return match TimeWindow::from_key(key) {
                Some(window) => CallbackAction::Chart(window),
                None => CallbackAction::Unknown,
            };
        }
        match data {
            "skip_note" => CallbackAction::SkipNote,
            "toggle_reminders" => CallbackAction::ToggleReminders,
            "set_morning" => CallbackAction::SetMorning,
            "set_evening" => CallbackAction::SetEvening,
            "set_timezone" => CallbackAction::SetTimezone,
            "open_chart_menu" => CallbackAction::OpenChartMenu,
            _ => CallbackAction::Unknown,
        }
    }
}

pub async fn ensure_user(state: &AppState, from: &TgUser) -> AppResult<User> {
    db::users::get_or_create(&state.db, from.id, from.username.as_deref()).await
}

pub fn bot_commands() -> Vec<BotCommand> {
    [
        ("start", "What this bot does"),
        ("log", "Log your current mood"),
        ("stats", "Your last 7 days"),
        ("moodchart", "Mood chart"),
        ("reminders", "Reminder settings"),
    ]
    .into_iter()
    .map(|(command, description)| BotCommand {
        command: command.into(),
        description: description.into(),
    })
    .collect()
}

// ── Tests ────────────────────────────────────────────────────────────
