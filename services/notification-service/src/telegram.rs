//! Minimal Telegram Bot API client: `getMe` on startup and `sendMessage`
//! per notification.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, Result};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers a text message to a chat.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: i64,
    text: &'a str,
}

pub struct TelegramService {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TelegramService {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(AppError::Telegram("TELEGRAM_BOT_TOKEN is not set".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Telegram(format!("failed to create Telegram client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<B, T>(&self, method: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.method_url(method));
        if let Some(body) = body {
            request = request.json(body);
        }
        // the URL embeds the bot token, keep it out of error messages
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Telegram(format!("{method} failed: {}", e.without_url())))?;
        let status = response.status();
        let parsed: ApiResponse<T> = response.json().await.map_err(|e| {
            AppError::Telegram(format!("{method} returned {status}: {}", e.without_url()))
        })?;
        match parsed {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(AppError::Telegram(format!(
                "{method} returned {status}: {}",
                description.unwrap_or_else(|| "no description".into())
            ))),
        }
    }

    /// Verifies the token with `getMe`.
    pub async fn connect(&self) -> Result<BotUser> {
        let bot: BotUser = self.call::<(), _>("getMe", None).await.map_err(|e| {
            AppError::Telegram(format!("failed to create Telegram bot: {e}"))
        })?;
        info!(
            bot_id = bot.id,
            username = bot.username.as_deref().unwrap_or(&bot.first_name),
            "telegram bot started"
        );
        Ok(bot)
    }
}

#[async_trait]
impl NotificationSender for TelegramService {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = SendMessageBody { chat_id, text };
        match self.call::<_, SentMessage>("sendMessage", Some(&body)).await {
            Ok(sent) => {
                info!(chat_id, telegram_message_id = sent.message_id, text, "message sent to telegram");
                Ok(())
            }
            Err(e) => {
                error!(%e, chat_id, text, "error sending message to telegram");
                Err(AppError::Telegram(format!("failed to send telegram message: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_rejected() {
        let err = TelegramService::new("").err().unwrap();
        assert_eq!(err.to_string(), "TELEGRAM_BOT_TOKEN is not set");
        assert!(TelegramService::new("   ").is_ok());
    }

    #[test]
    fn method_url_includes_token() {
        let svc = TelegramService::with_base_url("123:abc", "http://localhost:8081/").unwrap();
        assert_eq!(svc.method_url("getMe"), "http://localhost:8081/bot123:abc/getMe");
    }
}
