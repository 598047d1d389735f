//! Telegram Bot API client: long-polling updates in, rendered messages out.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::chat::event::{CallbackAction, ChatCommand, ChatEvent, ChatEventKind};
use crate::chat::render::{Keyboard, RenderInstruction};
use crate::chat::ReplySink;
use crate::config::TelegramConfig;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub data: Option<String>,
    pub message: Option<Message>,
}

/// Decode one update into a `ChatEvent`, or `None` for updates the bot does
/// not handle (edited messages, unknown callback data, non-command noise is
/// kept: free text is workflow input). Unknown callback identifiers are a
/// protocol violation: logged here and dropped.
pub fn decode_update(update: &Update) -> Option<ChatEvent> {
    if let Some(cb) = &update.callback_query {
        let data = cb.data.as_deref().unwrap_or_default();
        let Some(action) = CallbackAction::parse(data) else {
            tracing::warn!(user_id = cb.from.id, data, "Unrecognized callback data, ignoring");
            return None;
        };
        let message = cb.message.as_ref()?;
        return Some(ChatEvent {
            user_id: cb.from.id,
            chat_id: message.chat.id,
            message_id: Some(message.message_id),
            kind: ChatEventKind::Callback(action),
        });
    }

    if let Some(msg) = &update.message {
        let user_id = msg.from.as_ref()?.id;
        let text = msg.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }
        let kind = match text {
            "/start" => ChatEventKind::Command(ChatCommand::Start),
            "/cancel" => ChatEventKind::Command(ChatCommand::Cancel),
            t if t.starts_with('/') => {
                tracing::debug!(user_id, command = t, "Unknown command, ignoring");
                return None;
            }
            t => ChatEventKind::Text(t.to_string()),
        };
        return Some(ChatEvent {
            user_id,
            chat_id: msg.chat.id,
            message_id: None,
            kind,
        });
    }

    None
}

fn keyboard_markup(keyboard: &Keyboard) -> serde_json::Value {
    json!({
        "inline_keyboard": keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| json!({ "text": b.text, "callback_data": b.callback_data }))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
    })
}

pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, AppError> {
        // Long poll holds the connection open for poll_timeout_secs; give
        // the HTTP timeout headroom on top of that.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", config.api_base_url, config.bot_token),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, AppError> {
        let url = format!("{}/{}", self.base_url, method);
        let resp: TgResponse<T> = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !resp.ok {
            return Err(AppError::Telegram(
                resp.description
                    .unwrap_or_else(|| format!("{method} returned ok=false")),
            ));
        }
        resp.result
            .ok_or_else(|| AppError::Telegram(format!("{method} returned no result")))
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, AppError> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    /// Stop the client-side loading spinner on a button press.
    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<(), AppError> {
        self.call::<bool>("answerCallbackQuery", json!({ "callback_query_id": callback_id }))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ReplySink for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        instruction: &RenderInstruction,
    ) -> Result<(), AppError> {
        let mut body = json!({ "chat_id": chat_id, "text": instruction.text });
        if let Some(keyboard) = &instruction.keyboard {
            body["reply_markup"] = keyboard_markup(keyboard);
        }
        self.call::<serde_json::Value>("sendMessage", body).await?;
        Ok(())
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        instruction: &RenderInstruction,
    ) -> Result<(), AppError> {
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": instruction.text,
        });
        if let Some(keyboard) = &instruction.keyboard {
            body["reply_markup"] = keyboard_markup(keyboard);
        }
        self.call::<serde_json::Value>("editMessageText", body)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_json(s: &str) -> Update {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn decode_start_command() {
        let update = update_json(
            r#"{
                "update_id": 1,
                "message": {
                    "message_id": 10,
                    "from": { "id": 42 },
                    "chat": { "id": 42 },
                    "text": "/start"
                }
            }"#,
        );
        let event = decode_update(&update).unwrap();
        assert_eq!(event.user_id, 42);
        assert_eq!(event.message_id, None);
        assert_eq!(event.kind, ChatEventKind::Command(ChatCommand::Start));
    }

    #[test]
    fn decode_free_text() {
        let update = update_json(
            r#"{
                "update_id": 2,
                "message": {
                    "message_id": 11,
                    "from": { "id": 42 },
                    "chat": { "id": 99 },
                    "text": "  0.01  "
                }
            }"#,
        );
        let event = decode_update(&update).unwrap();
        assert_eq!(event.chat_id, 99);
        assert_eq!(event.kind, ChatEventKind::Text("0.01".to_string()));
    }

    #[test]
    fn decode_callback_press() {
        let update = update_json(
            r#"{
                "update_id": 3,
                "callback_query": {
                    "id": "cb1",
                    "from": { "id": 7 },
                    "data": "symbol_BTCUSDT",
                    "message": { "message_id": 55, "chat": { "id": 7 }, "text": "menu" }
                }
            }"#,
        );
        let event = decode_update(&update).unwrap();
        assert_eq!(event.message_id, Some(55));
        assert_eq!(
            event.kind,
            ChatEventKind::Callback(CallbackAction::Symbol("BTCUSDT".to_string()))
        );
    }

    #[test]
    fn decode_drops_unknown_callback_and_unknown_command() {
        let bad_cb = update_json(
            r#"{
                "update_id": 4,
                "callback_query": {
                    "id": "cb2",
                    "from": { "id": 7 },
                    "data": "rm_rf",
                    "message": { "message_id": 56, "chat": { "id": 7 }, "text": "menu" }
                }
            }"#,
        );
        assert!(decode_update(&bad_cb).is_none());

        let bad_cmd = update_json(
            r#"{
                "update_id": 5,
                "message": {
                    "message_id": 12,
                    "from": { "id": 42 },
                    "chat": { "id": 42 },
                    "text": "/selfdestruct"
                }
            }"#,
        );
        assert!(decode_update(&bad_cmd).is_none());
    }

    #[test]
    fn keyboard_markup_shape() {
        use crate::chat::render::main_menu_keyboard;
        let markup = keyboard_markup(&main_menu_keyboard());
        let rows = markup["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0]["callback_data"], "balance");
    }
}
