//! Telegram Bot API notification channel
//!
//! Sends via the `sendMessage` endpoint using MarkdownV2 formatting, which
//! requires escaping a fixed set of special characters.

use async_trait::async_trait;

use super::NotifyChannel;
use crate::error::{NotifyError, NotifyResult};
use crate::format::{payment_headline, payment_lines};
use crate::payment::PaymentRecord;

const API_BASE: &str = "https://api.telegram.org";

/// Telegram credentials and destination chat
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramConfig {
    /// Returns `None` when the channel is not configured.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        Some(Self { bot_token, chat_id })
    }
}

pub struct TelegramChannel {
    client: reqwest::Client,
    config: TelegramConfig,
    api_base: String,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_base: API_BASE.to_string(),
        }
    }

    /// Point the channel at a different API host (used by tests).
    pub fn with_api_base(config: TelegramConfig, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_base: api_base.into(),
        }
    }

    /// Escape special characters for Telegram MarkdownV2 format.
    pub fn escape_markdown_v2(text: &str) -> String {
        let special_chars = [
            '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
            '!',
        ];
        let mut result = String::with_capacity(text.len() * 2);
        for ch in text.chars() {
            if special_chars.contains(&ch) {
                result.push('\\');
            }
            result.push(ch);
        }
        result
    }

    fn format_message(record: &PaymentRecord) -> String {
        let mut lines = vec![format!(
            "\u{1F4B0} *{}*",
            Self::escape_markdown_v2(&payment_headline(record))
        )];
        lines.push(String::new());
        for (label, value) in payment_lines(record) {
            lines.push(format!("*{}*: {}", label, Self::escape_markdown_v2(&value)));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, record: &PaymentRecord) -> NotifyResult<()> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base, self.config.bot_token
        );
        let body = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": Self::format_message(record),
            "parse_mode": "MarkdownV2",
        });

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::ChannelFailed(format!(
                "Telegram returned HTTP {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
