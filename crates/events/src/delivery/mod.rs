//! Outbound notification channels.

pub mod email;
pub mod sms;
pub mod whatsapp;

use async_trait::async_trait;

use crate::message::NotificationMessage;

/// Error type shared by the channel senders.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Email(#[from] email::EmailError),

    /// Network, DNS or timeout failure talking to an HTTP provider.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Circuit breaker open, delivery skipped")]
    CircuitOpen,
}

/// One way of reaching a customer.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Channel name used in logs.
    fn channel(&self) -> &'static str;

    /// Send `message` to `recipient` (an email address or phone number).
    async fn send(&self, recipient: &str, message: &NotificationMessage) -> Result<(), DeliveryError>;
}

/// Shared POST-and-check for JSON provider APIs.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> Result<(), DeliveryError> {
    let mut request = client.post(url).json(body);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(DeliveryError::HttpStatus(response.status().as_u16()));
    }
    Ok(())
}
