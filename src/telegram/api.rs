//! Thin client for the handful of Bot API methods the bot uses.

use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::telegram::types::{ApiResponse, BotCommand, InlineKeyboardMarkup, Message, Update};

#[derive(Clone)]
pub struct TelegramApi {
    http: reqwest::Client,
    base: String,
}

impl TelegramApi {
    pub fn new(api_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> AppResult<serde_json::Value> {
        let response = self
            .http
            .post(format!("{}/{}", self.base, method))
            .json(&body)
            .send()
            .await?;
        let api: ApiResponse<serde_json::Value> = response.json().await?;
        if api.ok {
            Ok(api.result.unwrap_or(serde_json::Value::Null))
        } else {
            Err(AppError::Telegram(format!(
                "{method}: {} (code {})",
                api.description.unwrap_or_else(|| "unknown error".into()),
                api.error_code.unwrap_or_default(),
            )))
        }
    }

    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> AppResult<Vec<Update>> {
        let value = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": timeout_secs,
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;
        serde_json::from_value(value)
            .map_err(|e| AppError::Telegram(format!("getUpdates: bad payload: {e}")))
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> AppResult<Message> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = json!(keyboard);
        }
        let value = self.call("sendMessage", body).await?;
        serde_json::from_value(value)
            .map_err(|e| AppError::Telegram(format!("sendMessage: bad payload: {e}")))
    }

    /// Returns Ok(false) when Telegram rejects the edit because the message
    /// already shows exactly this content. Callers treat that as a no-op.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> AppResult<bool> {
        let mut body = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = json!(keyboard);
        }
        let response = self
            .http
            .post(format!("{}/editMessageText", self.base))
            .json(&body)
            .send()
            .await?;
        let api: ApiResponse<serde_json::Value> = response.json().await?;
        if api.ok {
            return Ok(true);
        }
        let description = api.description.unwrap_or_default();
        if description.contains("message is not modified") {
            return Ok(false);
        }
        Err(AppError::Telegram(format!("editMessageText: {description}")))
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> AppResult<()> {
        self.call(
            "deleteMessage",
            json!({ "chat_id": chat_id, "message_id": message_id }),
        )
        .await?;
        Ok(())
    }

    pub async fn send_photo(&self, chat_id: i64, png: Vec<u8>, caption: &str) -> AppResult<()> {
        let photo = reqwest::multipart::Part::bytes(png)
            .file_name("chart.png")
            .mime_str("image/png")?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", photo);
        let response = self
            .http
            .post(format!("{}/sendPhoto", self.base))
            .multipart(form)
            .send()
            .await?;
        let api: ApiResponse<serde_json::Value> = response.json().await?;
        if api.ok {
            Ok(())
        } else {
            Err(AppError::Telegram(format!(
                "sendPhoto: {}",
                api.description.unwrap_or_else(|| "unknown error".into()),
            )))
        }
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> AppResult<()> {
        self.call(
            "answerCallbackQuery",
            json!({ "callback_query_id": callback_query_id }),
        )
        .await?;
        Ok(())
    }

    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> AppResult<()> {
        self.call("setMyCommands", json!({ "commands": commands }))
            .await?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn edit_reports_noop_when_content_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/editMessageText"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: message is not modified: specified new message content and reply markup are exactly the same",
            })))
            .mount(&server)
            .await;

        let api = TelegramApi::new(&server.uri(), "TEST");
        let modified = api.edit_message_text(1, 2, "same text", None).await.unwrap();
        assert!(!modified);
    }

    #[tokio::test]
    async fn edit_surfaces_other_bad_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/editMessageText"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: message to edit not found",
            })))
            .mount(&server)
            .await;

        let api = TelegramApi::new(&server.uri(), "TEST");
        let result = api.edit_message_text(1, 2, "text", None).await;
        assert!(matches!(result, Err(AppError::Telegram(_))));
    }

    #[tokio::test]
    async fn send_message_includes_keyboard() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .and(body_string_contains("inline_keyboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "message_id": 5, "chat": { "id": 1 } },
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = TelegramApi::new(&server.uri(), "TEST");
        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![
                crate::telegram::types::InlineKeyboardButton::new("Skip", "skip_note"),
            ]],
        };
        let message = api.send_message(1, "hello", Some(&keyboard)).await.unwrap();
        assert_eq!(message.message_id, 5);
    }

    #[tokio::test]
    async fn api_errors_carry_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user",
            })))
            .mount(&server)
            .await;

        let api = TelegramApi::new(&server.uri(), "TEST");
        let err = api.send_message(1, "hi", None).await.unwrap_err();
        assert!(err.to_string().contains("blocked by the user"));
    }
}
