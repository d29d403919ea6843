//! Location model.

use salon_core::availability::LocationRules;
use salon_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `locations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Location {
    pub id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub utc_offset_minutes: i32,
    pub granularity_minutes: i32,
    pub smart_slots: bool,
    pub lead_time_minutes: i32,
    pub horizon_days: i32,
    pub max_slots: i32,
    /// Online bookings start out `PENDING` instead of `CONFIRMED`.
    pub requires_confirmation: bool,
    pub notify_email: bool,
    pub notify_sms: bool,
    pub notify_whatsapp: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Location {
    /// Booking rules for the availability engine.
    ///
    /// The table's CHECK constraints keep the integer columns positive.
    pub fn rules(&self) -> LocationRules {
        LocationRules {
            location_id: self.id,
            utc_offset_minutes: self.utc_offset_minutes,
            granularity_minutes: self.granularity_minutes.max(1) as u32,
            smart_slots: self.smart_slots,
            lead_time_minutes: self.lead_time_minutes.max(0) as u32,
            horizon_days: self.horizon_days.max(1) as u32,
            max_slots: self.max_slots.max(1) as usize,
        }
    }
}

/// DTO for creating a location. Omitted settings take the column defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLocation {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub utc_offset_minutes: Option<i32>,
    pub granularity_minutes: Option<i32>,
    pub smart_slots: Option<bool>,
    pub lead_time_minutes: Option<i32>,
    pub horizon_days: Option<i32>,
    pub requires_confirmation: Option<bool>,
}
