//! Email delivery via SMTP.
//!
//! Configuration is loaded from the environment; without `SMTP_HOST`,
//! [`EmailConfig::from_env`] returns `None` and no sender is built.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{DeliveryError, MessageSender};
use crate::message::NotificationMessage;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_FROM_ADDRESS: &str = "bookings@salon.local";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default                |
    /// |-----------------|----------|------------------------|
    /// | `SMTP_HOST`     | yes      | -                      |
    /// | `SMTP_PORT`     | no       | `587`                  |
    /// | `SMTP_FROM`     | no       | `bookings@salon.local` |
    /// | `SMTP_USER`     | no       | -                      |
    /// | `SMTP_PASSWORD` | no       | -                      |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailSender
// ---------------------------------------------------------------------------

pub struct EmailSender {
    config: EmailConfig,
}

impl EmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_email(&self, to: &str, message: &NotificationMessage) -> Result<Message, EmailError> {
        Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to.parse()?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))
    }

    async fn deliver(&self, to: &str, message: &NotificationMessage) -> Result<(), EmailError> {
        let email = self.build_email(to, message)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);
        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport_builder.build().send(email).await?;
        tracing::info!(to, kind = ?message.kind, "Notification email sent");
        Ok(())
    }
}

#[async_trait]
impl MessageSender for EmailSender {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send(&self, recipient: &str, message: &NotificationMessage) -> Result<(), DeliveryError> {
        Ok(self.deliver(recipient, message).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{tests::context, NotificationKind};

    fn sender() -> EmailSender {
        EmailSender::new(EmailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: DEFAULT_SMTP_PORT,
            from_address: DEFAULT_FROM_ADDRESS.into(),
            smtp_user: None,
            smtp_password: None,
        })
    }

    #[test]
    fn builds_plain_text_email() {
        let message = NotificationMessage::build(NotificationKind::Confirmation, &context());
        let email = sender().build_email("anna@example.com", &message).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("To: anna@example.com"));
        assert!(raw.contains("text/plain"));
    }

    #[test]
    fn invalid_recipient_is_an_address_error() {
        let message = NotificationMessage::build(NotificationKind::Confirmation, &context());
        let err = sender().build_email("not-an-email", &message).unwrap_err();
        assert!(err.to_string().contains("Email address parse error"));
    }

    #[test]
    fn build_error_display() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}
