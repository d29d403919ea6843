//! Customer notification dispatch.
//!
//! [`NotificationDispatcher`] subscribes to the [`EventBus`](crate::bus::EventBus),
//! loads the appointment's [`NotificationContext`] through a
//! [`NotificationContextSource`] and sends the message on every channel
//! that is configured, enabled for the location, and reachable for the
//! customer. Email goes through a [`CircuitBreaker`].

use std::sync::Arc;

use async_trait::async_trait;
use salon_core::types::DbId;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::breaker::CircuitBreaker;
use crate::bus::DomainEvent;
use crate::delivery::{DeliveryError, MessageSender};
use crate::message::{NotificationContext, NotificationKind, NotificationMessage};

#[derive(Debug, thiserror::Error)]
#[error("Failed to load notification context: {0}")]
pub struct ContextError(pub String);

/// Loads what a notification needs to know about an appointment.
#[async_trait]
pub trait NotificationContextSource: Send + Sync {
    /// `Ok(None)` when the appointment no longer exists.
    async fn load(&self, appointment_id: DbId) -> Result<Option<NotificationContext>, ContextError>;
}

/// Per-channel outcome of one dispatch, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

pub struct NotificationDispatcher {
    source: Arc<dyn NotificationContextSource>,
    email: Option<(Arc<dyn MessageSender>, CircuitBreaker)>,
    sms: Option<Arc<dyn MessageSender>>,
    whatsapp: Option<Arc<dyn MessageSender>>,
}

impl NotificationDispatcher {
    pub fn new(source: Arc<dyn NotificationContextSource>) -> Self {
        Self {
            source,
            email: None,
            sms: None,
            whatsapp: None,
        }
    }

    pub fn with_email(mut self, sender: Arc<dyn MessageSender>, breaker: CircuitBreaker) -> Self {
        self.email = Some((sender, breaker));
        self
    }

    pub fn with_sms(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.sms = Some(sender);
        self
    }

    pub fn with_whatsapp(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.whatsapp = Some(sender);
        self
    }

    /// Run until the bus closes or `cancel` fires.
    pub async fn run(self, mut receiver: broadcast::Receiver<DomainEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Notification dispatcher stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => {
                        self.handle(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Notification dispatcher lagged, events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, notification dispatcher shutting down");
                        break;
                    }
                },
            }
        }
    }

    /// Send the notification for one event, if it calls for one.
    pub async fn handle(&self, event: &DomainEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        let (Some(kind), Some(appointment_id)) =
            (NotificationKind::for_event(event), event.appointment_id)
        else {
            return report;
        };

        let ctx = match self.source.load(appointment_id).await {
            Ok(Some(ctx)) => ctx,
            Ok(None) => {
                tracing::debug!(appointment_id, "Appointment gone, notification skipped");
                return report;
            }
            Err(e) => {
                tracing::error!(appointment_id, error = %e, "Notification context unavailable");
                return report;
            }
        };
        let message = NotificationMessage::build(kind, &ctx);

        if let (Some((sender, breaker)), true, Some(to)) =
            (&self.email, ctx.notify_email, ctx.customer_email.as_deref())
        {
            let outcome = if breaker.allow() {
                let result = sender.send(to, &message).await;
                match &result {
                    Ok(()) => breaker.record_success(),
                    Err(_) => breaker.record_failure(),
                }
                result
            } else {
                Err(DeliveryError::CircuitOpen)
            };
            record(&mut report, sender.channel(), appointment_id, outcome);
        }

        if let (Some(sender), true, Some(to)) =
            (&self.sms, ctx.notify_sms, ctx.customer_phone.as_deref())
        {
            let outcome = sender.send(to, &message).await;
            record(&mut report, sender.channel(), appointment_id, outcome);
        }

        if let (Some(sender), true, true, Some(to)) = (
            &self.whatsapp,
            ctx.notify_whatsapp,
            ctx.whatsapp_opt_in,
            ctx.customer_phone.as_deref(),
        ) {
            let outcome = sender.send(to, &message).await;
            record(&mut report, sender.channel(), appointment_id, outcome);
        }

        report
    }
}

fn record(
    report: &mut DispatchReport,
    channel: &'static str,
    appointment_id: DbId,
    outcome: Result<(), DeliveryError>,
) {
    match outcome {
        Ok(()) => report.sent.push(channel),
        Err(e) => {
            tracing::warn!(appointment_id, channel, error = %e, "Notification delivery failed");
            report.failed.push(channel);
        }
    }
}
