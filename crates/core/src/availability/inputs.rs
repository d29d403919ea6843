//! Input snapshot, request and output types for the availability engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::intervals::TimeRange;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default slot grid in minutes.
pub const DEFAULT_GRANULARITY_MINUTES: u32 = 15;
/// Default booking horizon in days.
pub const DEFAULT_HORIZON_DAYS: u32 = 90;
/// Default cap on the number of slots returned by one request.
pub const DEFAULT_MAX_SLOTS: usize = 500;
/// Minutes in a day; the exclusive upper bound for `close_minute`.
pub const MINUTES_PER_DAY: u16 = 1440;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Per-location booking rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRules {
    pub location_id: DbId,
    /// Offset of the location's wall clock from UTC, in minutes.
    pub utc_offset_minutes: i32,
    pub granularity_minutes: u32,
    /// Offer off-grid starts that sit flush against existing bookings.
    pub smart_slots: bool,
    /// Minimum notice between "now" and a slot start.
    pub lead_time_minutes: u32,
    /// How far into the future slots may start.
    pub horizon_days: u32,
    pub max_slots: usize,
}

impl LocationRules {
    pub fn new(location_id: DbId) -> Self {
        Self {
            location_id,
            utc_offset_minutes: 0,
            granularity_minutes: DEFAULT_GRANULARITY_MINUTES,
            smart_slots: false,
            lead_time_minutes: 0,
            horizon_days: DEFAULT_HORIZON_DAYS,
            max_slots: DEFAULT_MAX_SLOTS,
        }
    }
}

// ---------------------------------------------------------------------------
// Declarative schedule inputs
// ---------------------------------------------------------------------------

/// A recurring weekly window in local wall-clock minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyRule {
    /// 0 = Monday ... 6 = Sunday.
    pub weekday: u8,
    pub open_minute: u16,
    pub close_minute: u16,
}

impl WeeklyRule {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.weekday > 6 {
            return Err(CoreError::Validation(format!(
                "weekday must be between 0 (Monday) and 6 (Sunday), got {}",
                self.weekday
            )));
        }
        validate_minutes(self.open_minute, self.close_minute)
    }
}

/// Validate a local `[open, close)` window expressed in minutes.
pub fn validate_minutes(open_minute: u16, close_minute: u16) -> Result<(), CoreError> {
    if open_minute >= close_minute || close_minute > MINUTES_PER_DAY {
        return Err(CoreError::Validation(format!(
            "Invalid window {open_minute}-{close_minute}: open must be before close and close at most {MINUTES_PER_DAY}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExceptionKind {
    /// Nobody works that day.
    Closed,
    /// That day's hours are replaced by this window.
    Open { open_minute: u16, close_minute: u16 },
}

/// A date-specific override of the weekly schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityException {
    pub date: NaiveDate,
    /// `None` applies to the whole location.
    pub staff_id: Option<DbId>,
    pub kind: ExceptionKind,
}

/// Working-time inputs for one staff member.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffAvailability {
    pub staff_id: DbId,
    /// Intervals from the external shift plan. Wins over `weekly` when present.
    pub shifts: Option<Vec<TimeRange>>,
    pub weekly: Vec<WeeklyRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOff {
    /// `None` closes the whole location.
    pub staff_id: Option<DbId>,
    pub range: TimeRange,
}

/// An already-booked appointment item. `range` includes its buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyItem {
    pub appointment_id: Option<DbId>,
    pub staff_id: Option<DbId>,
    pub resource_id: Option<DbId>,
    pub range: TimeRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub resource_id: DbId,
    /// Number of concurrent bookings the resource supports.
    pub capacity: u32,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// One leg of a service, executed after the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStep {
    pub duration_minutes: u32,
    #[serde(default)]
    pub buffer_before_minutes: u32,
    #[serde(default)]
    pub buffer_after_minutes: u32,
    /// `false` for processing time that only occupies a resource.
    #[serde(default = "default_true")]
    pub needs_staff: bool,
    /// Staff allowed to perform the step; empty means anyone.
    #[serde(default)]
    pub eligible_staff: Vec<DbId>,
    /// Any one of these resources is required; empty means none.
    #[serde(default)]
    pub resource_ids: Vec<DbId>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub service_id: DbId,
    pub steps: Vec<ServiceStep>,
}

impl ServiceDefinition {
    /// Total service time, buffers excluded.
    pub fn total_minutes(&self) -> i64 {
        self.steps.iter().map(|s| i64::from(s.duration_minutes)).sum()
    }
}

// ---------------------------------------------------------------------------
// Snapshot / request / result
// ---------------------------------------------------------------------------

/// Everything the engine needs to know about one location.
#[derive(Debug, Clone)]
pub struct AvailabilityInputs {
    pub location: LocationRules,
    pub opening_hours: Vec<WeeklyRule>,
    pub exceptions: Vec<AvailabilityException>,
    pub staff: Vec<StaffAvailability>,
    pub time_off: Vec<TimeOff>,
    pub bookings: Vec<BusyItem>,
    pub resources: Vec<ResourcePool>,
    pub services: Vec<ServiceDefinition>,
}

impl AvailabilityInputs {
    pub fn new(location: LocationRules) -> Self {
        Self {
            location,
            opening_hours: Vec::new(),
            exceptions: Vec::new(),
            staff: Vec::new(),
            time_off: Vec::new(),
            bookings: Vec::new(),
            resources: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn service(&self, service_id: DbId) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.service_id == service_id)
    }
}

#[derive(Debug, Clone)]
pub struct AvailabilityRequest {
    /// Services booked back to back, in order.
    pub service_ids: Vec<DbId>,
    /// First local date to search.
    pub from: NaiveDate,
    /// Last local date to search (inclusive).
    pub to: NaiveDate,
    /// When set, every staffed step must be performed by this staff member.
    pub staff_id: Option<DbId>,
    pub now: Timestamp,
    /// Ignore this appointment's own items (rescheduling).
    pub exclude_appointment: Option<DbId>,
}

/// Who does what, and when, inside a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAssignment {
    pub service_id: DbId,
    pub step_index: usize,
    pub staff_id: Option<DbId>,
    pub resource_id: Option<DbId>,
    /// Service time.
    pub range: TimeRange,
    /// Service time plus buffers; what the booking blocks on the calendar.
    pub blocked: TimeRange,
}

/// A bookable start for the requested service combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: Timestamp,
    pub end: Timestamp,
    pub assignments: Vec<StepAssignment>,
    pub slot_key: String,
    /// `true` when the start is off the location's grid.
    pub smart: bool,
    /// Idle minutes this booking would strand in staff calendars.
    pub waste_minutes: i64,
}

impl Slot {
    /// Distinct staff members involved, in assignment order.
    pub fn staff_ids(&self) -> Vec<DbId> {
        let mut ids = Vec::new();
        for id in self.assignments.iter().filter_map(|a| a.staff_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn resource_ids(&self) -> Vec<DbId> {
        let mut ids = Vec::new();
        for id in self.assignments.iter().filter_map(|a| a.resource_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}
