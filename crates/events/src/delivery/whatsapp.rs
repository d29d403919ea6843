//! WhatsApp delivery through a business messaging HTTP API.
//!
//! `POST {WHATSAPP_API_URL}` with
//! `{ "to", "type": "text", "text": { "body" } }` and a bearer token.
//! Only sent to customers who opted in to transactional WhatsApp messages.

use std::time::Duration;

use async_trait::async_trait;

use super::{post_json, DeliveryError, MessageSender};
use crate::message::NotificationMessage;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub api_token: Option<String>,
}

impl WhatsAppConfig {
    /// | Variable             | Required | Default |
    /// |----------------------|----------|---------|
    /// | `WHATSAPP_API_URL`   | yes      | -       |
    /// | `WHATSAPP_API_TOKEN` | no       | -       |
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("WHATSAPP_API_URL").ok()?;
        Some(Self {
            api_url,
            api_token: std::env::var("WHATSAPP_API_TOKEN").ok(),
        })
    }
}

pub struct WhatsAppSender {
    client: reqwest::Client,
    config: WhatsAppConfig,
}

impl WhatsAppSender {
    pub fn new(config: WhatsAppConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn payload(to: &str, message: &NotificationMessage) -> serde_json::Value {
        // The API expects the number without the leading '+'.
        serde_json::json!({
            "to": to.trim_start_matches('+'),
            "type": "text",
            "text": { "body": message.short_text },
        })
    }
}

#[async_trait]
impl MessageSender for WhatsAppSender {
    fn channel(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, recipient: &str, message: &NotificationMessage) -> Result<(), DeliveryError> {
        let body = Self::payload(recipient, message);
        post_json(&self.client, &self.config.api_url, self.config.api_token.as_deref(), &body).await?;
        tracing::info!(kind = ?message.kind, "Notification WhatsApp message sent");
        Ok(())
    }
}
