//! The provider trait and its error type.

use std::collections::HashMap;

use async_trait::async_trait;
use salon_core::intervals::TimeRange;

/// Shifts per employee id.
///
/// An employee present with an empty list is planned off for the whole
/// range. An employee absent from the map is unknown to the provider.
pub type Shifts = HashMap<String, Vec<TimeRange>>;

#[derive(Debug, thiserror::Error)]
pub enum ShiftPlanError {
    /// Network, DNS or timeout failure.
    #[error("Shift plan request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Shift plan provider returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Invalid shift plan response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ShiftPlanProvider: Send + Sync {
    /// Planned shifts of `employee_ids` overlapping `range`.
    async fn fetch_shifts(
        &self,
        employee_ids: &[String],
        range: TimeRange,
    ) -> Result<Shifts, ShiftPlanError>;
}
