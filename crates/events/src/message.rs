//! Notification content.
//!
//! Messages are plain text. `short_text` fits a single SMS segment and is
//! also used for WhatsApp.

use chrono::{Duration, FixedOffset, Offset, Utc};
use salon_core::types::{DbId, Timestamp};
use serde::Serialize;

use crate::bus::{DomainEvent, APPOINTMENT_CANCELLED, APPOINTMENT_CREATED, APPOINTMENT_RESCHEDULED};

/// Maximum length of `short_text` (one GSM-7 SMS segment).
pub const SHORT_TEXT_MAX_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Booking accepted and confirmed.
    Confirmation,
    /// Booking received, awaiting confirmation by the salon.
    Requested,
    Cancellation,
    Reschedule,
}

impl NotificationKind {
    /// The notification an event triggers, if any.
    pub fn for_event(event: &DomainEvent) -> Option<Self> {
        match event.event_type.as_str() {
            APPOINTMENT_CREATED => {
                if event.payload["status"] == "PENDING" {
                    Some(Self::Requested)
                } else {
                    Some(Self::Confirmation)
                }
            }
            APPOINTMENT_CANCELLED => Some(Self::Cancellation),
            APPOINTMENT_RESCHEDULED => Some(Self::Reschedule),
            _ => None,
        }
    }
}

/// Everything needed to tell a customer about one appointment.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationContext {
    pub appointment_id: DbId,
    pub location_name: String,
    pub location_phone: Option<String>,
    pub utc_offset_minutes: i32,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// Transactional WhatsApp messages allowed.
    pub whatsapp_opt_in: bool,
    pub service_names: Vec<String>,
    pub staff_names: Vec<String>,
    pub notify_email: bool,
    pub notify_sms: bool,
    pub notify_whatsapp: bool,
}

impl NotificationContext {
    /// Appointment start on the location's wall clock.
    pub fn local_start(&self) -> String {
        let offset = FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix());
        self.starts_at
            .with_timezone(&offset)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.ends_at - self.starts_at).max(Duration::zero()).num_minutes()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
    pub short_text: String,
}

impl NotificationMessage {
    pub fn build(kind: NotificationKind, ctx: &NotificationContext) -> Self {
        let when = ctx.local_start();
        let (headline, short) = match kind {
            NotificationKind::Confirmation => (
                format!("Your appointment at {} is confirmed", ctx.location_name),
                format!("{}: your appointment on {when} is confirmed.", ctx.location_name),
            ),
            NotificationKind::Requested => (
                format!("We received your booking request at {}", ctx.location_name),
                format!(
                    "{}: we received your request for {when} and will confirm shortly.",
                    ctx.location_name
                ),
            ),
            NotificationKind::Cancellation => (
                format!("Your appointment at {} was cancelled", ctx.location_name),
                format!("{}: your appointment on {when} was cancelled.", ctx.location_name),
            ),
            NotificationKind::Reschedule => (
                format!("Your appointment at {} was moved", ctx.location_name),
                format!("{}: your appointment was moved to {when}.", ctx.location_name),
            ),
        };

        let mut body = format!("Hello {},\n\n{headline}.\n\n", ctx.customer_name);
        body.push_str(&format!("When: {when} ({} min)\n", ctx.duration_minutes()));
        if !ctx.service_names.is_empty() {
            body.push_str(&format!("Services: {}\n", ctx.service_names.join(", ")));
        }
        if !ctx.staff_names.is_empty() {
            body.push_str(&format!("With: {}\n", ctx.staff_names.join(", ")));
        }
        if let Some(phone) = &ctx.location_phone {
            body.push_str(&format!("\nQuestions? Call us at {phone}.\n"));
        }

        Self {
            kind,
            subject: format!("{headline} ({when})"),
            body,
            short_text: truncate_chars(&short, SHORT_TEXT_MAX_CHARS),
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
