use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::db;
use crate::error::{AppError, AppResult};
use crate::handlers::common::ensure_user;
use crate::models::mood_log::{MAX_RATING, MIN_RATING};
use crate::models::session::SessionState;
use crate::models::user::User;
use crate::services::charts;
use crate::services::stats::{self, MoodStats};
use crate::services::timewindow::TimeWindow;
use crate::telegram::types::{InlineKeyboardButton, InlineKeyboardMarkup, TgUser};
use crate::AppState;

const START_TEXT: &str = "I help you keep an eye on your mood.\n\n\
    /log - log how you feel right now\n\
    /stats - your last 7 days at a glance\n\
    /moodchart - mood chart\n\
    /reminders - daily reminder settings";

const SAVED_TEXT: &str = "Logged it 🙌 See how the week looks: /stats";

pub async fn cmd_start(state: &AppState, chat_id: i64, from: &TgUser) -> AppResult<()> {
    ensure_user(state, from).await?;
    let text = format!("👋 Hi, {}! {START_TEXT}", from.first_name);
    state.api.send_message(chat_id, &text, None).await?;
    Ok(())
}

/// Starting a fresh log always abandons whatever dialog was pending.
pub async fn cmd_log(state: &AppState, chat_id: i64, from: &TgUser) -> AppResult<()> {
    ensure_user(state, from).await?;
    db::sessions::clear(&state.db, chat_id, from.id).await?;
    state
        .api
        .send_message(
            chat_id,
            "How's your mood right now? Rate it 1-10:",
            Some(&rating_keyboard()),
        )
        .await?;
    Ok(())
}

pub async fn rate(
    state: &AppState,
    chat_id: i64,
    message_id: i64,
    from: &TgUser,
    rating: i64,
) -> AppResult<()> {
    ensure_user(state, from).await?;
    db::sessions::set_state(&state.db, chat_id, from.id, &SessionState::AwaitingNote { rating })
        .await?;
    let text = format!("Noted: {rating}/10. Want to add a note? Type it below, or skip.");
    state
        .api
        .edit_message_text(chat_id, message_id, &text, Some(&skip_keyboard()))
        .await?;
    Ok(())
}

pub async fn process_note(
    state: &AppState,
    chat_id: i64,
    from: &TgUser,
    rating: i64,
    note: &str,
) -> AppResult<()> {
    let user = ensure_user(state, from).await?;
    db::mood_logs::create(&state.db, &user.id, rating, Some(note)).await?;
    db::sessions::clear(&state.db, chat_id, from.id).await?;
    state.api.send_message(chat_id, SAVED_TEXT, None).await?;
    Ok(())
}

pub async fn skip_note(
    state: &AppState,
    chat_id: i64,
    message_id: i64,
    from: &TgUser,
) -> AppResult<()> {
    // A stale or repeated tap must not create a second log.
    let SessionState::AwaitingNote { rating } =
        db::sessions::get_state(&state.db, chat_id, from.id).await?
    else {
        return Ok(());
    };
    let user = ensure_user(state, from).await?;
    db::mood_logs::create(&state.db, &user.id, rating, None).await?;
    db::sessions::clear(&state.db, chat_id, from.id).await?;
    state
        .api
        .edit_message_text(chat_id, message_id, SAVED_TEXT, None)
        .await?;
    Ok(())
}

pub async fn cmd_stats(state: &AppState, chat_id: i64, from: &TgUser) -> AppResult<()> {
    let user = ensure_user(state, from).await?;
    let Some(stats) = stats::weekly_stats(&state.db, user.telegram_id, Utc::now()).await? else {
        // only reachable if the row vanished between the two queries
        state
            .api
            .send_message(chat_id, "I don't know you yet. Send /start to begin.", None)
            .await?;
        return Ok(());
    };
    let text = format_stats(&stats, user.tz());
    let keyboard = (stats.count > 0).then(|| InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton::new("📈 Mood chart", "open_chart_menu")]],
    });
    state.api.send_message(chat_id, &text, keyboard.as_ref()).await?;
    Ok(())
}

fn format_stats(stats: &MoodStats, tz: Tz) -> String {
    if stats.count == 0 {
        return "No mood logs in the last 7 days yet. Start with /log".into();
    }
    let mut text = format!(
        "📊 Your last 7 days\n\nLogs: {}\nAverage mood: {:.1}",
        stats.count, stats.average
    );
    if let Some(best) = &stats.best {
        text.push_str(&format!(
            "\nBest: {}/10 on {}",
            best.rating,
            local_date(best.created_at, tz)
        ));
    }
    if let Some(worst) = &stats.worst {
        text.push_str(&format!(
            "\nWorst: {}/10 on {}",
            worst.rating,
            local_date(worst.created_at, tz)
        ));
    }
    text
}

fn local_date(created_at: NaiveDateTime, tz: Tz) -> String {
    Utc.from_utc_datetime(&created_at)
        .with_timezone(&tz)
        .format("%d.%m")
        .to_string()
}

pub async fn cmd_moodchart(state: &AppState, chat_id: i64, from: &TgUser) -> AppResult<()> {
    ensure_user(state, from).await?;
    send_chart_menu(state, chat_id).await
}

pub async fn send_chart_menu(state: &AppState, chat_id: i64) -> AppResult<()> {
    state
        .api
        .send_message(chat_id, "Pick a period:", Some(&chart_menu_keyboard()))
        .await?;
    Ok(())
}

/// Renders and delivers a chart. The per-user flag absorbs repeat button
/// presses while a render is already in flight.
pub async fn send_chart(
    state: &AppState,
    chat_id: i64,
    message_id: i64,
    from: &TgUser,
    window: TimeWindow,
) -> AppResult<()> {
    let user = ensure_user(state, from).await?;
    if !db::sessions::try_claim_chart(&state.db, chat_id, from.id).await? {
        tracing::debug!(chat_id, user_id = from.id, "Chart already rendering, dropping repeat press");
        return Ok(());
    }

    let result = run_chart(state, &user, chat_id, message_id, window).await;
    if let Err(e) = db::sessions::release_chart(&state.db, chat_id, from.id).await {
        tracing::error!(chat_id, user_id = from.id, error = %e, "Failed to release chart flag");
    }
    if result.is_err() {
        // best effort, the error itself still reaches the dispatch log
        if let Err(e) = state
            .api
            .send_message(chat_id, "Couldn't draw the chart this time. Please try again.", None)
            .await
        {
            tracing::debug!(chat_id, error = %e, "Could not deliver chart failure notice");
        }
    }
    result
}

async fn run_chart(
    state: &AppState,
    user: &User,
    chat_id: i64,
    message_id: i64,
    window: TimeWindow,
) -> AppResult<()> {
    let data = charts::chart_data_for(&state.db, user, window, Utc::now()).await?;
    if data.points.is_empty() {
        state
            .api
            .edit_message_text(
                chat_id,
                message_id,
                "No logs in this period yet. Add one with /log",
                None,
            )
            .await?;
        return Ok(());
    }

    state
        .api
        .edit_message_text(chat_id, message_id, "Drawing your chart...", None)
        .await?;

    let caption = data.title;
    let png = tokio::task::spawn_blocking(move || charts::render_png(&data))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Chart render task died: {}", e)))??;

    // Best effort: the photo still goes out if the placeholder is gone.
    if let Err(e) = state.api.delete_message(chat_id, message_id).await {
        tracing::debug!(chat_id, error = %e, "Could not delete chart placeholder");
    }
    state.api.send_photo(chat_id, png, caption).await?;
    Ok(())
}

fn rating_keyboard() -> InlineKeyboardMarkup {
    let inline_keyboard = [MIN_RATING..=5, 6..=MAX_RATING]
        .into_iter()
        .map(|row| {
            row.map(|n| InlineKeyboardButton::new(n.to_string(), format!("rate:{n}")))
                .collect()
        })
        .collect();
    InlineKeyboardMarkup { inline_keyboard }
}

fn skip_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton::new("Skip", "skip_note")]],
    }
}

fn chart_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            InlineKeyboardButton::new("Today", format!("chart:{}", TimeWindow::Day.key())),
            InlineKeyboardButton::new("Last 7 days", format!("chart:{}", TimeWindow::Week.key())),
        ]],
    }
}

// ── Tests ────────────────────────────────────────────────────────────
