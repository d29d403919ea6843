//! Staff member and location membership models.

use salon_core::metadata::StaffMetadata;
use salon_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `staff` table. The PIN hash is never serialized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Staff {
    pub id: DbId,
    pub location_id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub role: String,
    #[serde(skip_serializing)]
    pub pin_hash: Option<String>,
    pub metadata: serde_json::Value,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Staff {
    pub fn parsed_metadata(&self) -> StaffMetadata {
        StaffMetadata::from_value(&self.metadata)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A staff member as seen from one location, with the role held there.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LocationStaff {
    pub id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub metadata: serde_json::Value,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStaff {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    /// Defaults to `staff`.
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// A row from the `staff_location_memberships` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StaffMembership {
    pub id: DbId,
    pub staff_id: DbId,
    pub location_id: DbId,
    pub role: String,
    pub created_at: Timestamp,
}
