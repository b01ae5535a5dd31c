use chrono::NaiveTime;

use crate::db;
use crate::error::AppResult;
use crate::handlers::common::ensure_user;
use crate::models::session::SessionState;
use crate::models::user::User;
use crate::services::timezones;
use crate::telegram::types::{InlineKeyboardButton, InlineKeyboardMarkup, TgUser};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderSlot {
    Morning,
    Evening,
}

impl ReminderSlot {
    fn awaiting_state(&self) -> SessionState {
        match self {
            ReminderSlot::Morning => SessionState::AwaitingMorningTime,
            ReminderSlot::Evening => SessionState::AwaitingEveningTime,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ReminderSlot::Morning => "morning",
            ReminderSlot::Evening => "evening",
        }
    }
}

pub async fn cmd_reminders(state: &AppState, chat_id: i64, from: &TgUser) -> AppResult<()> {
    let user = ensure_user(state, from).await?;
    let (text, keyboard) = menu_view(&user);
    state.api.send_message(chat_id, &text, Some(&keyboard)).await?;
    Ok(())
}

fn menu_view(user: &User) -> (String, InlineKeyboardMarkup) {
    let status = if user.reminders_enabled { "on" } else { "off" };
    let morning = user
        .morning_time
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "not set".into());
    let evening = user
        .evening_time
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "not set".into());

    let text = format!(
        "⏰ Reminder settings\n\n\
         Status: {status}\n\
         Morning: {morning}\n\
         Evening: {evening}\n\
         Timezone: {timezone}\n\n\
         Times are on your local clock.",
        timezone = user.timezone,
    );

    let toggle = if user.reminders_enabled {
        "🔕 Turn off"
    } else {
        "🔔 Turn on"
    };
    let keyboard = InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![InlineKeyboardButton::new(toggle, "toggle_reminders")],
            vec![
                InlineKeyboardButton::new("🌅 Morning time", "set_morning"),
                InlineKeyboardButton::new("🌆 Evening time", "set_evening"),
            ],
            vec![InlineKeyboardButton::new("🌍 Timezone", "set_timezone")],
        ],
    };
    (text, keyboard)
}

/// Flips reminders on or off and redraws the menu in place.
pub async fn toggle(
    state: &AppState,
    chat_id: i64,
    message_id: i64,
    from: &TgUser,
) -> AppResult<()> {
    let user = ensure_user(state, from).await?;
    let user =
        db::users::set_reminders_enabled(&state.db, &user.id, !user.reminders_enabled).await?;
    let (text, keyboard) = menu_view(&user);
    state
        .api
        .edit_message_text(chat_id, message_id, &text, Some(&keyboard))
        .await?;
    Ok(())
}

pub async fn ask_time(
    state: &AppState,
    chat_id: i64,
    message_id: i64,
    from: &TgUser,
    slot: ReminderSlot,
) -> AppResult<()> {
    db::sessions::set_state(&state.db, chat_id, from.id, &slot.awaiting_state()).await?;
    let text = format!(
        "When should the {} reminder arrive? Send a time as HH:MM, e.g. 09:00",
        slot.label()
    );
    state
        .api
        .edit_message_text(chat_id, message_id, &text, None)
        .await?;
    Ok(())
}

pub async fn ask_timezone(
    state: &AppState,
    chat_id: i64,
    message_id: i64,
    from: &TgUser,
) -> AppResult<()> {
    db::sessions::set_state(&state.db, chat_id, from.id, &SessionState::AwaitingTimezone).await?;
    state
        .api
        .edit_message_text(
            chat_id,
            message_id,
            "Which timezone are you in? Send a city or an IANA name, e.g. Warsaw or Europe/Warsaw",
            None,
        )
        .await?;
    Ok(())
}

/// Invalid input re-prompts and keeps the dialog state, so the user can
/// just try again.
pub async fn process_time_input(
    state: &AppState,
    chat_id: i64,
    from: &TgUser,
    text: &str,
    slot: ReminderSlot,
) -> AppResult<()> {
    let Some(time) = parse_hhmm(text) else {
        state
            .api
            .send_message(
                chat_id,
                "That doesn't look like a time. Send HH:MM, e.g. 09:00",
                None,
            )
            .await?;
        return Ok(());
    };

    let user = ensure_user(state, from).await?;
    let user = match slot {
        ReminderSlot::Morning => db::users::set_morning_time(&state.db, &user.id, time).await?,
        ReminderSlot::Evening => db::users::set_evening_time(&state.db, &user.id, time).await?,
    };
    db::sessions::clear(&state.db, chat_id, from.id).await?;

    let confirm = format!(
        "Done, the {} reminder is set to {}",
        slot.label(),
        time.format("%H:%M")
    );
    state.api.send_message(chat_id, &confirm, None).await?;

    let (text, keyboard) = menu_view(&user);
    state.api.send_message(chat_id, &text, Some(&keyboard)).await?;
    Ok(())
}

pub async fn process_timezone_input(
    state: &AppState,
    chat_id: i64,
    from: &TgUser,
    text: &str,
) -> AppResult<()> {
    let Some(tz) = timezones::resolve(text) else {
        state
            .api
            .send_message(
                chat_id,
                "I couldn't recognize that timezone. Try a city like Warsaw, or an IANA name like Europe/Warsaw",
                None,
            )
            .await?;
        return Ok(());
    };

    let user = ensure_user(state, from).await?;
    let user = db::users::set_timezone(&state.db, &user.id, tz.name()).await?;
    db::sessions::clear(&state.db, chat_id, from.id).await?;

    state
        .api
        .send_message(chat_id, &format!("Timezone set to {}", tz.name()), None)
        .await?;

    let (text, keyboard) = menu_view(&user);
    state.api.send_message(chat_id, &text, Some(&keyboard)).await?;
    Ok(())
}

fn parse_hhmm(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M").ok()
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;
    use crate::handlers::dispatch_update;
    use crate::telegram::api::TelegramApi;
    use crate::telegram::types::{CallbackQuery, Chat, Message, Update};
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_state(server: &MockServer) -> AppState {
        AppState {
            db: testing::pool().await,
            api: TelegramApi::new(&server.uri(), "TEST"),
        }
    }

    async fn mount_catch_all(server: &MockServer) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "message_id": 1, "chat": { "id": 10 } },
            })))
            .mount(server)
            .await;
    }

    fn tg_user(id: i64) -> TgUser {
        TgUser {
            id,
            first_name: "Sam".into(),
            username: None,
        }
    }

    fn text_update(update_id: i64, chat_id: i64, from_id: i64, text: &str) -> Update {
        Update {
            update_id,
            message: Some(Message {
                message_id: 1,
                chat: Chat { id: chat_id },
                from: Some(tg_user(from_id)),
                text: Some(text.into()),
            }),
            callback_query: None,
        }
    }

    fn callback_update(update_id: i64, chat_id: i64, from_id: i64, data: &str) -> Update {
        Update {
            update_id,
            message: None,
            callback_query: Some(CallbackQuery {
                id: format!("cb-{update_id}"),
                from: tg_user(from_id),
                message: Some(Message {
                    message_id: 55,
                    chat: Chat { id: chat_id },
                    from: None,
                    text: None,
                }),
                data: Some(data.into()),
            }),
        }
    }

    #[test]
    fn parses_strict_hhmm() {
        assert_eq!(parse_hhmm("09:00"), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(parse_hhmm("23:59"), NaiveTime::from_hms_opt(23, 59, 0));
        assert_eq!(parse_hhmm(" 7:05 "), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("12:60"), None);
        assert_eq!(parse_hhmm("noonish"), None);
        assert_eq!(parse_hhmm("09:00:30"), None);
        assert_eq!(parse_hhmm(""), None);
    }

    #[test]
    fn menu_reflects_user_settings() {
        let user = User {
            id: "u-1".into(),
            telegram_id: 42,
            username: None,
            created_at: chrono::Utc::now().naive_utc(),
            reminders_enabled: true,
            morning_time: NaiveTime::from_hms_opt(7, 30, 0),
            evening_time: None,
            timezone: "Europe/Warsaw".into(),
        };
        let (text, keyboard) = menu_view(&user);
        assert!(text.contains("Status: on"));
        assert!(text.contains("Morning: 07:30"));
        assert!(text.contains("Evening: not set"));
        assert!(text.contains("Timezone: Europe/Warsaw"));
        assert_eq!(keyboard.inline_keyboard[0][0].text, "🔕 Turn off");
    }

    #[tokio::test]
    async fn set_morning_time_flow() {
        let server = MockServer::start().await;
        mount_catch_all(&server).await;
        let state = test_state(&server).await;

        dispatch_update(&state, callback_update(1, 10, 42, "set_morning")).await;
        assert_eq!(
            db::sessions::get_state(&state.db, 10, 42).await.unwrap(),
            SessionState::AwaitingMorningTime
        );

        dispatch_update(&state, text_update(2, 10, 42, "07:30")).await;

        let user = db::users::find_by_telegram_id(&state.db, 42).await.unwrap().unwrap();
        assert_eq!(user.morning_time, NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(
            db::sessions::get_state(&state.db, 10, 42).await.unwrap(),
            SessionState::Idle
        );
    }

    #[tokio::test]
    async fn invalid_time_reprompts_and_keeps_state() {
        let server = MockServer::start().await;
        mount_catch_all(&server).await;
        let state = test_state(&server).await;

        dispatch_update(&state, text_update(1, 10, 42, "/reminders")).await;
        dispatch_update(&state, callback_update(2, 10, 42, "set_evening")).await;
        dispatch_update(&state, text_update(3, 10, 42, "around nine")).await;

        let user = db::users::find_by_telegram_id(&state.db, 42).await.unwrap().unwrap();
        // migration default untouched
        assert_eq!(user.evening_time, NaiveTime::from_hms_opt(20, 0, 0));
        assert_eq!(
            db::sessions::get_state(&state.db, 10, 42).await.unwrap(),
            SessionState::AwaitingEveningTime
        );

        // a second, valid attempt completes the dialog
        dispatch_update(&state, text_update(4, 10, 42, "22:15")).await;
        let user = db::users::find_by_telegram_id(&state.db, 42).await.unwrap().unwrap();
        assert_eq!(user.evening_time, NaiveTime::from_hms_opt(22, 15, 0));
        assert_eq!(
            db::sessions::get_state(&state.db, 10, 42).await.unwrap(),
            SessionState::Idle
        );
    }

    #[tokio::test]
    async fn timezone_flow_accepts_city_alias() {
        let server = MockServer::start().await;
        mount_catch_all(&server).await;
        let state = test_state(&server).await;

        dispatch_update(&state, callback_update(1, 10, 42, "set_timezone")).await;
        dispatch_update(&state, text_update(2, 10, 42, "warsaw")).await;

        let user = db::users::find_by_telegram_id(&state.db, 42).await.unwrap().unwrap();
        assert_eq!(user.timezone, "Europe/Warsaw");
        assert_eq!(
            db::sessions::get_state(&state.db, 10, 42).await.unwrap(),
            SessionState::Idle
        );
    }

    #[tokio::test]
    async fn unresolvable_timezone_reprompts() {
        let server = MockServer::start().await;
        mount_catch_all(&server).await;
        let state = test_state(&server).await;

        dispatch_update(&state, text_update(1, 10, 42, "/reminders")).await;
        dispatch_update(&state, callback_update(2, 10, 42, "set_timezone")).await;
        dispatch_update(&state, text_update(3, 10, 42, "gondor")).await;

        let user = db::users::find_by_telegram_id(&state.db, 42).await.unwrap().unwrap();
        assert_eq!(user.timezone, "UTC");
        assert_eq!(
            db::sessions::get_state(&state.db, 10, 42).await.unwrap(),
            SessionState::AwaitingTimezone
        );
    }

    #[tokio::test]
    async fn toggle_flips_enabled_both_ways() {
        let server = MockServer::start().await;
        mount_catch_all(&server).await;
        let state = test_state(&server).await;

        dispatch_update(&state, text_update(1, 10, 42, "/reminders")).await;
        dispatch_update(&state, callback_update(2, 10, 42, "toggle_reminders")).await;

        let user = db::users::find_by_telegram_id(&state.db, 42).await.unwrap().unwrap();
        assert!(user.reminders_enabled);

        dispatch_update(&state, callback_update(3, 10, 42, "toggle_reminders")).await;
        let user = db::users::find_by_telegram_id(&state.db, 42).await.unwrap().unwrap();
        assert!(!user.reminders_enabled);
    }
}
