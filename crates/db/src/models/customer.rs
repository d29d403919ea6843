//! Customer and consent models.

use salon_core::consent::{ConsentAction, ConsentEvent, ConsentType};
use salon_core::metadata::CustomerMetadata;
use salon_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `customers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    pub id: DbId,
    pub location_id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Customer {
    pub fn parsed_metadata(&self) -> CustomerMetadata {
        CustomerMetadata::from_value(&self.metadata)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// DTO for creating a customer. Contact fields are expected normalized.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// DTO for updating a customer. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCustomer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// A row from the `consent_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConsentRecord {
    pub id: DbId,
    pub customer_id: DbId,
    pub consent_type: String,
    pub action: String,
    pub source: String,
    pub recorded_at: Timestamp,
}

impl ConsentRecord {
    /// `None` for rows with values outside the known vocabularies.
    pub fn event(&self) -> Option<ConsentEvent> {
        Some(ConsentEvent {
            consent_type: ConsentType::from_str(&self.consent_type)?,
            action: ConsentAction::from_str(&self.action)?,
            at: self.recorded_at,
        })
    }
}
