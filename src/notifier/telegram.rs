use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::app::{RelayError, Result};
use crate::config::TelegramConfig;
use crate::notifier::Notifier;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API client
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: Client, bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client,
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// `None` unless enabled with both a token and a chat id.
    pub fn from_config(client: Client, config: &TelegramConfig) -> Option<Self> {
        if config.enabled && !config.bot_token.is_empty() && !config.chat_id.is_empty() {
            Some(Self::new(client, &config.bot_token, &config.chat_id))
        } else {
            None
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.bot_token, method)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(RelayError::Other(format!(
                "Telegram API error ({}): {}",
                status, error_text
            )));
        }

        Ok(())
    }
}
