use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::alerts::messenger::Messenger;
use crate::config::UPDATES_LONG_POLL_SECS;
use crate::error::DispatchError;
use crate::types::{ButtonAction, Keyboard, MessageRef};

/// Bot API envelope: `{ "ok": true, "result": ... }` or
/// `{ "ok": false, "error_code": .., "description": .. }`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    chat: Chat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub callback_query: Option<CallbackQuery>,
}

pub struct TelegramClient {
    client: reqwest::Client,
    /// `{api}/bot{token}`
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, DispatchError> {
        // must outlive the getUpdates long poll
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPDATES_LONG_POLL_SECS + 15))
            .build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
    ) -> Result<T, DispatchError> {
        let url = format!("{}/{}", self.base_url, method);
        let response: ApiResponse<T> =
            self.client.post(&url).json(&body).send().await?.json().await?;
        unwrap_result(response)
    }

    /// Callback-query updates after `offset`, waiting up to `timeout_secs`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, DispatchError> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["callback_query"],
            }),
        )
        .await
    }

    pub async fn answer_callback(
        &self,
        callback_id: &str,
        text: &str,
    ) -> Result<(), DispatchError> {
        let _: bool = self
            .call("answerCallbackQuery", json!({ "callback_query_id": callback_id, "text": text }))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, DispatchError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = reply_markup(keyboard);
        }
        let message: Message = self.call("sendMessage", body).await?;
        debug!(chat_id, message_id = message.message_id, "Message sent");
        Ok(MessageRef { chat_id: message.chat.id, message_id: message.message_id })
    }

    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), DispatchError> {
        let mut body = json!({
            "chat_id": message.chat_id,
            "message_id": message.message_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = reply_markup(keyboard);
        }
        match self.call::<Value>("editMessageText", body).await {
            Ok(_) => Ok(()),
            // Same status pressed twice.
            Err(DispatchError::Api { description, .. })
                if description.contains("message is not modified") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn unwrap_result<T>(response: ApiResponse<T>) -> Result<T, DispatchError> {
    match (response.ok, response.result) {
        (true, Some(result)) => Ok(result),
        _ => Err(DispatchError::Api {
            code: response.error_code.unwrap_or_default(),
            description: response.description.unwrap_or_else(|| "empty response".to_string()),
        }),
    }
}

/// `InlineKeyboardMarkup` JSON.
fn reply_markup(keyboard: &Keyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.action {
                    ButtonAction::Url(url) => json!({ "text": button.text, "url": url }),
                    ButtonAction::Callback(data) => {
                        json!({ "text": button.text, "callback_data": data })
                    }
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}
