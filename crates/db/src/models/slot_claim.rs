//! Slot claim model.

use salon_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `booking_slot_claims` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SlotClaim {
    pub id: DbId,
    pub location_id: DbId,
    pub slot_key: String,
    pub idempotency_key: String,
    pub claimed_at: Timestamp,
    pub expires_at: Timestamp,
}
