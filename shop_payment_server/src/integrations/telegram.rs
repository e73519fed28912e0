//! The Telegram Bot API client.
//!
//! Sends buyer-facing messages with HTML formatting and answers callback queries. The bot token is part of the
//! request URL, so it never appears in logs.

use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde_json::{json, Value};

use crate::{
    config::TelegramConfig,
    errors::ServerError,
    notifier::{ChannelError, NotificationChannel},
    telegram::types::InlineKeyboardMarkup,
};

#[derive(Clone)]
pub struct TelegramApi {
    client: Arc<Client>,
    base_url: String,
}

impl TelegramApi {
    pub fn new(config: &TelegramConfig) -> Result<Self, ServerError> {
        let client = Client::builder().build().map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let base_url = format!("{}/bot{}", config.api_url, config.bot_token.reveal());
        Ok(Self { client: Arc::new(client), base_url })
    }

    async fn call(&self, method: &str, payload: Value) -> Result<(), ChannelError> {
        let url = format!("{}/{method}", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::RequestFailed(e.to_string()))?;
        if response.status().is_success() {
            trace!("📣️ Telegram {method} call succeeded");
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(ChannelError::ApiError(format!("{method} returned status {status}: {message}")))
        }
    }
}

impl NotificationChannel for TelegramApi {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), ChannelError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(keyboard) = keyboard {
            payload["reply_markup"] =
                serde_json::to_value(keyboard).map_err(|e| ChannelError::RequestFailed(e.to_string()))?;
        }
        self.call("sendMessage", payload).await
    }

    async fn acknowledge_callback(&self, callback_id: &str) -> Result<(), ChannelError> {
        self.call("answerCallbackQuery", json!({ "callback_query_id": callback_id })).await
    }
}
