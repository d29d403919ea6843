//! Service and resource models.

use salon_core::availability::{ResourcePool, ServiceDefinition, ServiceStep};
use salon_core::error::CoreError;
use salon_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `services` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Service {
    pub id: DbId,
    pub location_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    /// JSON array of [`ServiceStep`].
    pub steps: serde_json::Value,
    pub bookable_online: bool,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Service {
    pub fn parsed_steps(&self) -> Result<Vec<ServiceStep>, CoreError> {
        serde_json::from_value(self.steps.clone()).map_err(|e| {
            CoreError::Internal(format!("Malformed steps for service {}: {e}", self.id))
        })
    }

    /// Engine view of the service.
    ///
    /// `qualified_staff` comes from `service_staff` and applies to every
    /// staffed step that does not list its own eligible staff.
    pub fn definition(&self, qualified_staff: &[DbId]) -> Result<ServiceDefinition, CoreError> {
        let mut steps = self.parsed_steps()?;
        if steps.is_empty() {
            return Err(CoreError::Internal(format!("Service {} has no steps", self.id)));
        }
        for step in steps.iter_mut().filter(|s| s.needs_staff) {
            if step.eligible_staff.is_empty() {
                step.eligible_staff = qualified_staff.to_vec();
            }
        }
        Ok(ServiceDefinition {
            service_id: self.id,
            steps,
        })
    }

    /// Service time of all steps, buffers excluded.
    pub fn duration_minutes(&self) -> Result<i64, CoreError> {
        Ok(self
            .parsed_steps()?
            .iter()
            .map(|s| i64::from(s.duration_minutes))
            .sum())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateService {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: Option<i32>,
    pub steps: Vec<ServiceStep>,
    pub bookable_online: Option<bool>,
}

/// A row from the `resources` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Resource {
    pub id: DbId,
    pub location_id: DbId,
    pub name: String,
    pub capacity: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl Resource {
    pub fn pool(&self) -> ResourcePool {
        ResourcePool {
            resource_id: self.id,
            capacity: self.capacity.max(1) as u32,
        }
    }
}
