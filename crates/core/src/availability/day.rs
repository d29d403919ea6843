//! Per-day free-time computation: location open hours, staff free
//! intervals and resource free intervals for one local date.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::calendar::{local_day, minute_window, weekday_index};
use super::inputs::{AvailabilityInputs, BusyItem, ExceptionKind, StaffAvailability, WeeklyRule};
use crate::intervals::{intersect_all, normalize, subtract, TimeRange};
use crate::types::{DbId, Timestamp};

/// Free time on one local date.
#[derive(Debug, Clone)]
pub(crate) struct DayPlan {
    /// The local day in UTC.
    pub(crate) day: TimeRange,
    /// Location open intervals, location-wide time-off removed.
    pub(crate) open: Vec<TimeRange>,
    /// Per staff: working time minus time-off minus bookings.
    pub(crate) staff_free: BTreeMap<DbId, Vec<TimeRange>>,
    /// Per resource: open time minus periods at full capacity.
    pub(crate) resource_free: BTreeMap<DbId, Vec<TimeRange>>,
}

impl DayPlan {
    pub(crate) fn build(inputs: &AvailabilityInputs, date: NaiveDate, bookings: &[BusyItem]) -> Self {
        let offset = inputs.location.utc_offset_minutes;
        let day = local_day(date, offset);
        let open = location_open(inputs, date);

        let staff_free = inputs
            .staff
            .iter()
            .map(|staff| {
                let working = staff_working(inputs, staff, date, &open);
                let busy: Vec<TimeRange> = bookings
                    .iter()
                    .filter(|b| b.staff_id == Some(staff.staff_id))
                    .map(|b| b.range)
                    .collect();
                (staff.staff_id, subtract(&working, &busy))
            })
            .collect();

        let mut capacities: BTreeMap<DbId, u32> = inputs
            .resources
            .iter()
            .map(|r| (r.resource_id, r.capacity))
            .collect();
        for step in inputs.services.iter().flat_map(|s| s.steps.iter()) {
            for resource_id in &step.resource_ids {
                capacities.entry(*resource_id).or_insert(1);
            }
        }

        let resource_free = capacities
            .into_iter()
            .map(|(resource_id, capacity)| {
                if capacity == 0 {
                    return (resource_id, Vec::new());
                }
                let busy: Vec<TimeRange> = bookings
                    .iter()
                    .filter(|b| b.resource_id == Some(resource_id))
                    .map(|b| b.range)
                    .collect();
                let full = saturated_ranges(&busy, capacity);
                (resource_id, subtract(&open, &full))
            })
            .collect();

        Self {
            day,
            open,
            staff_free,
            resource_free,
        }
    }
}

/// Location open intervals for `date`, exceptions applied.
fn location_open(inputs: &AvailabilityInputs, date: NaiveDate) -> Vec<TimeRange> {
    let offset = inputs.location.utc_offset_minutes;
    let exceptions: Vec<&ExceptionKind> = inputs
        .exceptions
        .iter()
        .filter(|e| e.date == date && e.staff_id.is_none())
        .map(|e| &e.kind)
        .collect();

    if exceptions.iter().any(|k| matches!(k, ExceptionKind::Closed)) {
        return Vec::new();
    }

    let overrides = exception_windows(&exceptions, date, offset);
    let hours = if overrides.is_empty() {
        weekly_windows(&inputs.opening_hours, date, offset)
    } else {
        overrides
    };

    let closed: Vec<TimeRange> = inputs
        .time_off
        .iter()
        .filter(|t| t.staff_id.is_none())
        .map(|t| t.range)
        .collect();
    subtract(&normalize(hours), &closed)
}

/// Working time of one staff member on `date`, clipped to `open`.
fn staff_working(
    inputs: &AvailabilityInputs,
    staff: &StaffAvailability,
    date: NaiveDate,
    open: &[TimeRange],
) -> Vec<TimeRange> {
    let offset = inputs.location.utc_offset_minutes;
    let day = local_day(date, offset);
    let exceptions: Vec<&ExceptionKind> = inputs
        .exceptions
        .iter()
        .filter(|e| e.date == date && e.staff_id == Some(staff.staff_id))
        .map(|e| &e.kind)
        .collect();

    if exceptions.iter().any(|k| matches!(k, ExceptionKind::Closed)) {
        return Vec::new();
    }

    let overrides = exception_windows(&exceptions, date, offset);
    let base = if !overrides.is_empty() {
        overrides
    } else if let Some(shifts) = &staff.shifts {
        shifts.iter().filter_map(|s| s.intersect(&day)).collect()
    } else if !staff.weekly.is_empty() {
        weekly_windows(&staff.weekly, date, offset)
    } else {
        open.to_vec()
    };

    let working = intersect_all(&base, open);
    let off: Vec<TimeRange> = inputs
        .time_off
        .iter()
        .filter(|t| t.staff_id == Some(staff.staff_id))
        .map(|t| t.range)
        .collect();
    subtract(&working, &off)
}

fn weekly_windows(rules: &[WeeklyRule], date: NaiveDate, offset: i32) -> Vec<TimeRange> {
    let weekday = weekday_index(date);
    rules
        .iter()
        .filter(|r| r.weekday == weekday)
        .filter_map(|r| minute_window(date, r.open_minute, r.close_minute, offset))
        .collect()
}

fn exception_windows(kinds: &[&ExceptionKind], date: NaiveDate, offset: i32) -> Vec<TimeRange> {
    kinds
        .iter()
        .filter_map(|k| match k {
            ExceptionKind::Open {
                open_minute,
                close_minute,
            } => minute_window(date, *open_minute, *close_minute, offset),
            ExceptionKind::Closed => None,
        })
        .collect()
}

/// Periods during which at least `capacity` of `busy` overlap.
pub fn saturated_ranges(busy: &[TimeRange], capacity: u32) -> Vec<TimeRange> {
    let capacity = i64::from(capacity);
    let mut edges: Vec<(Timestamp, i64)> = busy
        .iter()
        .flat_map(|r| [(r.start, 1), (r.end, -1)])
        .collect();
    // Ends sort before starts at the same instant so touching bookings
    // do not count as concurrent.
    edges.sort();

    let mut count = 0;
    let mut full_since: Option<Timestamp> = None;
    let mut out = Vec::new();
    for (instant, delta) in edges {
        let before = count;
        count += delta;
        if before < capacity && count >= capacity {
            full_since = Some(instant);
        } else if before >= capacity && count < capacity {
            if let Some(range) = full_since.take().and_then(|s| TimeRange::from_bounds(s, instant)) {
                out.push(range);
            }
        }
    }
    normalize(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn r(h1: u32, m1: u32, h2: u32, m2: u32) -> TimeRange {
        TimeRange::new(at(h1, m1), at(h2, m2)).unwrap()
    }

    #[test]
    fn capacity_one_saturates_on_any_booking() {
        let full = saturated_ranges(&[r(9, 0, 10, 0), r(11, 0, 12, 0)], 1);
        assert_eq!(full, vec![r(9, 0, 10, 0), r(11, 0, 12, 0)]);
    }

    #[test]
    fn capacity_two_saturates_only_on_overlap() {
        let full = saturated_ranges(&[r(9, 0, 10, 0), r(9, 30, 11, 0), r(12, 0, 13, 0)], 2);
        assert_eq!(full, vec![r(9, 30, 10, 0)]);
    }

    #[test]
    fn touching_bookings_are_not_concurrent() {
        let full = saturated_ranges(&[r(9, 0, 10, 0), r(10, 0, 11, 0)], 2);
        assert!(full.is_empty());
    }
}
