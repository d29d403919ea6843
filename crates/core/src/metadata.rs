//! Typed views over the JSON metadata blobs stored on appointments, staff
//! and customers.
//!
//! Unknown keys are preserved through `extra` so records written by other
//! tools survive a read-modify-write cycle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::payment::PaymentStatus;
use crate::repeat::RepeatRule;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Appointment metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingChannel {
    Online,
    #[default]
    Backoffice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub staff_id: Option<DbId>,
    pub at: Timestamp,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentChange {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub at: Timestamp,
    pub staff_id: Option<DbId>,
    pub note: Option<String>,
}

/// Links an appointment to its repeat series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesLink {
    pub series_id: Uuid,
    /// 0 for the appointment the series was created from.
    pub index: u32,
    pub rule: RepeatRule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentMetadata {
    #[serde(default)]
    pub channel: BookingChannel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audit: Vec<AuditEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payment_history: Vec<PaymentChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<SeriesLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_key: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AppointmentMetadata {
    pub fn new(channel: BookingChannel) -> Self {
        Self {
            channel,
            ..Default::default()
        }
    }

    /// Parse a stored blob. `null` reads as empty metadata.
    pub fn parse(value: &serde_json::Value) -> Result<Self, CoreError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
            .map_err(|e| CoreError::Internal(format!("Malformed appointment metadata: {e}")))
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }

    /// Append an audit entry.
    pub fn record(
        &mut self,
        action: impl Into<String>,
        staff_id: Option<DbId>,
        at: Timestamp,
        details: serde_json::Value,
    ) {
        self.audit.push(AuditEntry {
            action: action.into(),
            staff_id,
            at,
            details,
        });
    }

    /// Append a payment change and its matching audit entry.
    pub fn record_payment(
        &mut self,
        from: PaymentStatus,
        to: PaymentStatus,
        staff_id: Option<DbId>,
        at: Timestamp,
        note: Option<String>,
    ) {
        self.payment_history.push(PaymentChange {
            from,
            to,
            at,
            staff_id,
            note,
        });
        self.record(
            "payment_status_changed",
            staff_id,
            at,
            serde_json::json!({ "from": from, "to": to }),
        );
    }
}

// ---------------------------------------------------------------------------
// Staff / customer metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffMetadata {
    /// Employee id in the external shift-planning system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift_plan_employee_id: Option<String>,
    pub bookable_online: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for StaffMetadata {
    fn default() -> Self {
        Self {
            shift_plan_employee_id: None,
            bookable_online: true,
            extra: Default::default(),
        }
    }
}

impl StaffMetadata {
    /// Lenient read: malformed blobs fall back to defaults.
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetadata {
    /// Transactional WhatsApp messages allowed.
    #[serde(default)]
    pub whatsapp_opt_in: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CustomerMetadata {
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}
