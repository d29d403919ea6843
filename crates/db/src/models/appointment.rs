//! Appointment and appointment item models.

use chrono::Duration;
use salon_core::appointment_status::AppointmentStatus;
use salon_core::availability::{BusyItem, StepAssignment};
use salon_core::error::CoreError;
use salon_core::intervals::TimeRange;
use salon_core::items::ItemSpan;
use salon_core::metadata::AppointmentMetadata;
use salon_core::payment::PaymentStatus;
use salon_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `appointments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appointment {
    pub id: DbId,
    pub location_id: DbId,
    pub customer_id: Option<DbId>,
    pub status: String,
    pub payment_status: String,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Appointment {
    pub fn parsed_status(&self) -> Result<AppointmentStatus, CoreError> {
        AppointmentStatus::from_str(&self.status).ok_or_else(|| {
            CoreError::Internal(format!("Unknown appointment status '{}'", self.status))
        })
    }

    pub fn parsed_payment_status(&self) -> Result<PaymentStatus, CoreError> {
        PaymentStatus::from_str(&self.payment_status).ok_or_else(|| {
            CoreError::Internal(format!("Unknown payment status '{}'", self.payment_status))
        })
    }

    pub fn parsed_metadata(&self) -> Result<AppointmentMetadata, CoreError> {
        AppointmentMetadata::parse(&self.metadata)
    }
}

/// A row from the `appointment_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AppointmentItem {
    pub id: DbId,
    pub appointment_id: DbId,
    pub service_id: DbId,
    pub staff_id: Option<DbId>,
    pub resource_id: Option<DbId>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub buffer_before_minutes: i32,
    pub buffer_after_minutes: i32,
    pub created_at: Timestamp,
}

impl AppointmentItem {
    pub fn range(&self) -> Result<TimeRange, CoreError> {
        TimeRange::new(self.starts_at, self.ends_at)
    }

    /// Service time plus buffers.
    pub fn blocked(&self) -> Result<TimeRange, CoreError> {
        Ok(self.range()?.expand(
            Duration::minutes(i64::from(self.buffer_before_minutes)),
            Duration::minutes(i64::from(self.buffer_after_minutes)),
        ))
    }

    pub fn span(&self) -> Result<ItemSpan, CoreError> {
        Ok(ItemSpan {
            service_id: self.service_id,
            staff_id: self.staff_id,
            resource_id: self.resource_id,
            range: self.range()?,
        })
    }

    pub fn busy(&self) -> Result<BusyItem, CoreError> {
        Ok(BusyItem {
            appointment_id: Some(self.appointment_id),
            staff_id: self.staff_id,
            resource_id: self.resource_id,
            range: self.blocked()?,
        })
    }
}

/// An appointment with its items, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentWithItems {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub items: Vec<AppointmentItem>,
}

/// Insert payload for `appointments`. Built by the API, never deserialized.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub location_id: DbId,
    pub customer_id: Option<DbId>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
    pub metadata: serde_json::Value,
}

/// Insert payload for `appointment_items`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointmentItem {
    pub service_id: DbId,
    pub staff_id: Option<DbId>,
    pub resource_id: Option<DbId>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub buffer_before_minutes: i32,
    pub buffer_after_minutes: i32,
}

impl NewAppointmentItem {
    pub fn from_assignment(assignment: &StepAssignment) -> Self {
        let before = (assignment.range.start - assignment.blocked.start).num_minutes();
        let after = (assignment.blocked.end - assignment.range.end).num_minutes();
        Self {
            service_id: assignment.service_id,
            staff_id: assignment.staff_id,
            resource_id: assignment.resource_id,
            starts_at: assignment.range.start,
            ends_at: assignment.range.end,
            buffer_before_minutes: before as i32,
            buffer_after_minutes: after as i32,
        }
    }

    /// Copy of an existing item moved by `delta`.
    pub fn shifted(item: &AppointmentItem, delta: Duration) -> Self {
        Self {
            service_id: item.service_id,
            staff_id: item.staff_id,
            resource_id: item.resource_id,
            starts_at: item.starts_at + delta,
            ends_at: item.ends_at + delta,
            buffer_before_minutes: item.buffer_before_minutes,
            buffer_after_minutes: item.buffer_after_minutes,
        }
    }

    /// Service time without buffers.
    pub fn range(&self) -> Option<TimeRange> {
        TimeRange::from_bounds(self.starts_at, self.ends_at)
    }

    pub fn blocked(&self) -> Option<TimeRange> {
        TimeRange::from_bounds(
            self.starts_at - Duration::minutes(i64::from(self.buffer_before_minutes)),
            self.ends_at + Duration::minutes(i64::from(self.buffer_after_minutes)),
        )
    }
}

/// DTO for patching an appointment's customer and notes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointment {
    pub customer_id: Option<DbId>,
    pub notes: Option<String>,
}
