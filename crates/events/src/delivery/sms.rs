//! SMS delivery through a JSON HTTP gateway.
//!
//! `POST {SMS_API_URL}` with `{ "from", "to", "text" }` and a bearer token.

use std::time::Duration;

use async_trait::async_trait;

use super::{post_json, DeliveryError, MessageSender};
use crate::message::NotificationMessage;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_SENDER: &str = "Salon";

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    /// Alphanumeric sender id shown on the handset.
    pub sender: String,
}

impl SmsConfig {
    /// | Variable        | Required | Default |
    /// |-----------------|----------|---------|
    /// | `SMS_API_URL`   | yes      | -       |
    /// | `SMS_API_TOKEN` | no       | -       |
    /// | `SMS_SENDER`    | no       | `Salon` |
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("SMS_API_URL").ok()?;
        Some(Self {
            api_url,
            api_token: std::env::var("SMS_API_TOKEN").ok(),
            sender: std::env::var("SMS_SENDER").unwrap_or_else(|_| DEFAULT_SENDER.to_string()),
        })
    }
}

pub struct SmsSender {
    client: reqwest::Client,
    config: SmsConfig,
}

impl SmsSender {
    pub fn new(config: SmsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn payload(&self, to: &str, message: &NotificationMessage) -> serde_json::Value {
        serde_json::json!({
            "from": self.config.sender,
            "to": to,
            "text": message.short_text,
        })
    }
}

#[async_trait]
impl MessageSender for SmsSender {
    fn channel(&self) -> &'static str {
        "sms"
    }

    async fn send(&self, recipient: &str, message: &NotificationMessage) -> Result<(), DeliveryError> {
        let body = self.payload(recipient, message);
        post_json(&self.client, &self.config.api_url, self.config.api_token.as_deref(), &body).await?;
        tracing::info!(kind = ?message.kind, "Notification SMS sent");
        Ok(())
    }
}
