//! Weekly hours, time off and availability exception models.

use chrono::NaiveDate;
use salon_core::availability::{AvailabilityException, ExceptionKind, TimeOff, WeeklyRule};
use salon_core::intervals::TimeRange;
use salon_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Weekly hours
// ---------------------------------------------------------------------------

/// A row from the `weekly_hours` table. `staff_id = None` is location hours.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WeeklyHours {
    pub id: DbId,
    pub location_id: DbId,
    pub staff_id: Option<DbId>,
    pub weekday: i16,
    pub open_minute: i32,
    pub close_minute: i32,
    pub created_at: Timestamp,
}

impl WeeklyHours {
    pub fn rule(&self) -> WeeklyRule {
        WeeklyRule {
            weekday: self.weekday.clamp(0, 6) as u8,
            open_minute: self.open_minute.clamp(0, 1440) as u16,
            close_minute: self.close_minute.clamp(0, 1440) as u16,
        }
    }
}

/// One weekly window in a replace-all request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeeklyWindow {
    pub weekday: u8,
    pub open_minute: u16,
    pub close_minute: u16,
}

impl WeeklyWindow {
    pub fn rule(&self) -> WeeklyRule {
        WeeklyRule {
            weekday: self.weekday,
            open_minute: self.open_minute,
            close_minute: self.close_minute,
        }
    }
}

// ---------------------------------------------------------------------------
// Time off
// ---------------------------------------------------------------------------

/// A row from the `time_off` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimeOffEntry {
    pub id: DbId,
    pub location_id: DbId,
    pub staff_id: Option<DbId>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub reason: Option<String>,
    pub created_at: Timestamp,
}

impl TimeOffEntry {
    /// `None` only for rows violating the table's `ends_at > starts_at` check.
    pub fn time_off(&self) -> Option<TimeOff> {
        Some(TimeOff {
            staff_id: self.staff_id,
            range: TimeRange::from_bounds(self.starts_at, self.ends_at)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTimeOff {
    pub staff_id: Option<DbId>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Exceptions
// ---------------------------------------------------------------------------

/// A row from the `availability_exceptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExceptionEntry {
    pub id: DbId,
    pub location_id: DbId,
    pub staff_id: Option<DbId>,
    pub exception_date: NaiveDate,
    pub kind: String,
    pub open_minute: Option<i32>,
    pub close_minute: Option<i32>,
    pub note: Option<String>,
    pub created_at: Timestamp,
}

impl ExceptionEntry {
    pub fn exception(&self) -> Option<AvailabilityException> {
        let kind = match (self.kind.as_str(), self.open_minute, self.close_minute) {
            ("closed", _, _) => ExceptionKind::Closed,
            ("open", Some(open), Some(close)) => ExceptionKind::Open {
                open_minute: open.clamp(0, 1440) as u16,
                close_minute: close.clamp(0, 1440) as u16,
            },
            _ => return None,
        };
        Some(AvailabilityException {
            date: self.exception_date,
            staff_id: self.staff_id,
            kind,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateException {
    pub staff_id: Option<DbId>,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kind: ExceptionKind,
    pub note: Option<String>,
}
