//! REST client for the external shift-planning service.
//!
//! `GET {base_url}/shifts?employee_ids=a,b&from=<rfc3339>&to=<rfc3339>`
//! with a bearer token, answering
//! `{ "shifts": [{ "employee_id": "a", "start": "...", "end": "..." }] }`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use salon_core::intervals::{normalize, TimeRange};
use salon_core::types::Timestamp;
use serde::Deserialize;

use crate::provider::{ShiftPlanError, ShiftPlanProvider, Shifts};

/// HTTP request timeout for one fetch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// ShiftPlanConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ShiftPlanConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

impl ShiftPlanConfig {
    /// Load from the environment. `None` when no provider is configured.
    ///
    /// | Variable              | Required | Default |
    /// |-----------------------|----------|---------|
    /// | `SHIFTPLAN_BASE_URL`  | yes      | -       |
    /// | `SHIFTPLAN_API_TOKEN` | no       | -       |
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("SHIFTPLAN_BASE_URL").ok()?;
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: std::env::var("SHIFTPLAN_API_TOKEN").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ShiftsResponse {
    shifts: Vec<WireShift>,
}

#[derive(Debug, Deserialize)]
struct WireShift {
    employee_id: String,
    start: Timestamp,
    end: Timestamp,
}

/// Group wire shifts per requested employee.
///
/// Every requested employee gets an entry: the provider answering without
/// shifts for someone means they are planned off. Shifts of employees that
/// were not asked for are dropped.
fn group_shifts(employee_ids: &[String], wire: Vec<WireShift>) -> Result<Shifts, ShiftPlanError> {
    let mut shifts: Shifts = employee_ids.iter().map(|id| (id.clone(), Vec::new())).collect();
    for shift in wire {
        let range = TimeRange::from_bounds(shift.start, shift.end).ok_or_else(|| {
            ShiftPlanError::InvalidResponse(format!(
                "shift for {} ends before it starts",
                shift.employee_id
            ))
        })?;
        if let Some(list) = shifts.get_mut(&shift.employee_id) {
            list.push(range);
        }
    }
    for list in shifts.values_mut() {
        *list = normalize(std::mem::take(list));
    }
    Ok(shifts)
}

// ---------------------------------------------------------------------------
// HttpShiftPlanClient
// ---------------------------------------------------------------------------

pub struct HttpShiftPlanClient {
    client: reqwest::Client,
    config: ShiftPlanConfig,
}

impl HttpShiftPlanClient {
    pub fn new(config: ShiftPlanConfig) -> Result<Self, ShiftPlanError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ShiftPlanProvider for HttpShiftPlanClient {
    async fn fetch_shifts(
        &self,
        employee_ids: &[String],
        range: TimeRange,
    ) -> Result<Shifts, ShiftPlanError> {
        if employee_ids.is_empty() {
            return Ok(Shifts::new());
        }

        let url = format!("{}/shifts", self.config.base_url);
        let mut request = self.client.get(&url).query(&[
            ("employee_ids", employee_ids.join(",")),
            ("from", range.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("to", range.end.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ]);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ShiftPlanError::HttpStatus(response.status().as_u16()));
        }
        let body: ShiftsResponse = response
            .json()
            .await
            .map_err(|e| ShiftPlanError::InvalidResponse(e.to_string()))?;

        let shifts = group_shifts(employee_ids, body.shifts)?;
        tracing::debug!(employees = employee_ids.len(), "Fetched shift plan");
        Ok(shifts)
    }
}
