//! Shared query parameter types for API handlers.

use chrono::NaiveDate;
use salon_core::intervals::TimeRange;
use salon_core::types::{DbId, Timestamp};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// `?service_ids=1,2&from=YYYY-MM-DD&to=YYYY-MM-DD&staff_id=`
#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    /// Comma-separated, in booking order.
    pub service_ids: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub staff_id: Option<DbId>,
}

impl AvailabilityParams {
    pub fn service_ids(&self) -> AppResult<Vec<DbId>> {
        parse_id_list(&self.service_ids)
    }
}

/// Parse `"1, 2,3"` into ids. Empty input yields an empty list.
pub fn parse_id_list(raw: &str) -> AppResult<Vec<DbId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<DbId>()
                .map_err(|_| AppError::BadRequest(format!("Invalid id in list: '{s}'")))
        })
        .collect()
}

/// `?from=&to=&staff_id=` over instants.
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub from: Timestamp,
    pub to: Timestamp,
    pub staff_id: Option<DbId>,
}

impl RangeParams {
    pub fn range(&self) -> AppResult<TimeRange> {
        TimeRange::from_bounds(self.from, self.to)
            .ok_or_else(|| AppError::BadRequest("'to' must be after 'from'".into()))
    }
}

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD` over local dates.
#[derive(Debug, Deserialize)]
pub struct DateRangeParams {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// `?q=&limit=`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<i64>,
}
