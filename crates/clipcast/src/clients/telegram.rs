use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use super::http::{read_json, HttpError};
use crate::pipeline::services::Notifier;

/// Sends chat notifications through the Telegram bot API.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
}

impl TelegramNotifier {
    pub fn new(http: reqwest::Client, api_base: &str, bot_token: SecretString) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, chat_id: i64, text: &str) -> Result<(), HttpError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.bot_token.expose_secret()
        );
        let response = self
            .http
            .post(url)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await?;
        let body: serde_json::Value = read_json(response).await?;
        if body.get("ok").and_then(|ok| ok.as_bool()) == Some(false) {
            let description = body
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("sendMessage rejected");
            return Err(HttpError::api(description));
        }
        Ok(())
    }
}
