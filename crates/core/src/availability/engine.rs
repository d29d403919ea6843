//! Slot search: candidate generation, step assignment and smart-slot ranking.

use chrono::Duration;

use super::day::DayPlan;
use super::inputs::{
    AvailabilityInputs, AvailabilityRequest, BusyItem, ServiceDefinition, ServiceStep, Slot,
    StepAssignment,
};
use crate::error::CoreError;
use crate::intervals::{find_containing, TimeRange};
use crate::slot_key::slot_key;
use crate::types::{DbId, Timestamp};

/// Longest date window a single request may search.
pub const MAX_WINDOW_DAYS: i64 = 62;

/// Compute the bookable slots for `request` against the `inputs` snapshot.
///
/// Slots are sorted by start, then by wasted minutes, and capped at the
/// location's `max_slots`.
pub fn find_availability(
    inputs: &AvailabilityInputs,
    request: &AvailabilityRequest,
) -> Result<Vec<Slot>, CoreError> {
    let services = resolve_services(inputs, &request.service_ids)?;
    let rules = &inputs.location;

    if request.to < request.from {
        return Err(CoreError::Validation(
            "'to' date must not be before 'from' date".into(),
        ));
    }
    if (request.to - request.from).num_days() >= MAX_WINDOW_DAYS {
        return Err(CoreError::Validation(format!(
            "Availability window must not exceed {MAX_WINDOW_DAYS} days"
        )));
    }
    if rules.granularity_minutes == 0 {
        return Err(CoreError::Validation(
            "Slot granularity must be at least one minute".into(),
        ));
    }

    let earliest = request.now + Duration::minutes(i64::from(rules.lead_time_minutes));
    let latest = request.now + Duration::days(i64::from(rules.horizon_days));

    let bookings: Vec<BusyItem> = inputs
        .bookings
        .iter()
        .filter(|b| request.exclude_appointment.is_none() || b.appointment_id != request.exclude_appointment)
        .copied()
        .collect();

    // Idle fragments shorter than the shortest requested service count as
    // waste.
    let shortest_service = services
        .iter()
        .map(|s| s.total_minutes())
        .filter(|m| *m > 0)
        .min()
        .unwrap_or(0);

    let mut slots = Vec::new();
    let mut date = request.from;
    loop {
        let plan = DayPlan::build(inputs, date, &bookings);
        if plan.day.end > earliest && plan.day.start <= latest {
            let planner = SlotPlanner {
                inputs,
                plan: &plan,
                services: &services,
                preferred_staff: request.staff_id,
                shortest_service,
            };
            slots.extend(planner.slots(earliest, latest));
        }
        if date >= request.to {
            break;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    slots.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.waste_minutes.cmp(&b.waste_minutes))
    });
    slots.truncate(rules.max_slots);
    Ok(slots)
}

fn resolve_services<'a>(
    inputs: &'a AvailabilityInputs,
    service_ids: &[DbId],
) -> Result<Vec<&'a ServiceDefinition>, CoreError> {
    if service_ids.is_empty() {
        return Err(CoreError::Validation(
            "At least one service must be requested".into(),
        ));
    }
    service_ids
        .iter()
        .map(|id| {
            let service = inputs.service(*id).ok_or(CoreError::NotFound {
                entity: "Service",
                id: *id,
            })?;
            if service.steps.is_empty() || service.steps.iter().any(|s| s.duration_minutes == 0) {
                return Err(CoreError::Validation(format!(
                    "Service {id} has no bookable duration"
                )));
            }
            Ok(service)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Per-day planner
// ---------------------------------------------------------------------------

struct SlotPlanner<'a> {
    inputs: &'a AvailabilityInputs,
    plan: &'a DayPlan,
    services: &'a [&'a ServiceDefinition],
    preferred_staff: Option<DbId>,
    shortest_service: i64,
}

impl SlotPlanner<'_> {
    fn slots(&self, earliest: Timestamp, latest: Timestamp) -> Vec<Slot> {
        let location_id = self.inputs.location.location_id;
        let mut slots = Vec::new();

        for (start, smart) in self.candidates(earliest, latest) {
            let Some(assignments) = self.assign(start) else {
                continue;
            };
            let Some(end) = assignments.last().map(|a| a.range.end) else {
                continue;
            };
            slots.push(Slot {
                start,
                end,
                waste_minutes: self.waste(&assignments),
                slot_key: slot_key(location_id, &assignments),
                assignments,
                smart,
            });
        }

        self.drop_unhelpful_smart_slots(slots)
    }

    /// Candidate starts, flagged `true` when off the grid.
    fn candidates(&self, earliest: Timestamp, latest: Timestamp) -> Vec<(Timestamp, bool)> {
        let granularity_secs = i64::from(self.inputs.location.granularity_minutes) * 60;
        let mut out: std::collections::BTreeMap<Timestamp, bool> = Default::default();

        for open in &self.plan.open {
            let since_midnight = (open.start - self.plan.day.start).num_seconds();
            let remainder = since_midnight.rem_euclid(granularity_secs);
            let mut start = if remainder == 0 {
                open.start
            } else {
                open.start + Duration::seconds(granularity_secs - remainder)
            };
            while start < open.end {
                if start >= earliest && start <= latest {
                    out.insert(start, false);
                }
                start += Duration::seconds(granularity_secs);
            }
        }

        if self.inputs.location.smart_slots {
            let (lead_buffer, tail) = self.edge_padding();
            for free in self.plan.staff_free.values() {
                for interval in free {
                    let flush_left = interval.start + lead_buffer;
                    let flush_right = interval.end - tail;
                    for start in [flush_left, flush_right] {
                        let in_open = self.plan.open.iter().any(|o| o.contains(start));
                        if in_open && start >= earliest && start <= latest {
                            out.entry(start).or_insert(true);
                        }
                    }
                }
            }
        }

        out.into_iter().collect()
    }

    /// Padding needed before the first step and after the start of the
    /// booking for it to sit flush against a free interval's edges.
    fn edge_padding(&self) -> (Duration, Duration) {
        let steps: Vec<&ServiceStep> = self.services.iter().flat_map(|s| s.steps.iter()).collect();
        let lead = steps
            .first()
            .filter(|s| s.needs_staff)
            .map(|s| Duration::minutes(i64::from(s.buffer_before_minutes)))
            .unwrap_or_else(Duration::zero);
        let total: i64 = steps.iter().map(|s| i64::from(s.duration_minutes)).sum();
        let trailing = steps
            .last()
            .filter(|s| s.needs_staff)
            .map(|s| i64::from(s.buffer_after_minutes))
            .unwrap_or(0);
        (lead, Duration::minutes(total + trailing))
    }

    /// Lay the requested steps end to end from `start`, assigning staff
    /// and resources. `None` when any step cannot be served.
    fn assign(&self, start: Timestamp) -> Option<Vec<StepAssignment>> {
        let mut cursor = start;
        let mut assignments: Vec<StepAssignment> = Vec::new();
        let mut previous_staff: Option<DbId> = None;

        for service in self.services {
            for (step_index, step) in service.steps.iter().enumerate() {
                let range = TimeRange::from_minutes(cursor, i64::from(step.duration_minutes))?;
                let blocked = range.expand(
                    Duration::minutes(i64::from(step.buffer_before_minutes)),
                    Duration::minutes(i64::from(step.buffer_after_minutes)),
                );

                let staff_id = if step.needs_staff {
                    Some(self.pick_staff(step, &range, &blocked, previous_staff, &assignments)?)
                } else {
                    None
                };
                let resource_id = if step.resource_ids.is_empty() {
                    None
                } else {
                    Some(self.pick_resource(step, &range, &blocked, &assignments)?)
                };

                if staff_id.is_some() {
                    previous_staff = staff_id;
                }
                assignments.push(StepAssignment {
                    service_id: service.service_id,
                    step_index,
                    staff_id,
                    resource_id,
                    range,
                    blocked,
                });
                cursor = range.end;
            }
        }

        // The whole combination must fit in a single opening window.
        let whole = TimeRange::from_bounds(start, cursor)?;
        find_containing(&self.plan.open, &whole)?;
        Some(assignments)
    }

    /// Prefer the previous step's staff, then the tightest fit, then the
    /// lowest id. The fit is the idle time left on both sides of `blocked`
    /// inside the free interval that holds it.
    fn pick_staff(
        &self,
        step: &ServiceStep,
        range: &TimeRange,
        blocked: &TimeRange,
        previous: Option<DbId>,
        assigned: &[StepAssignment],
    ) -> Option<DbId> {
        self.plan
            .staff_free
            .iter()
            .filter(|(id, _)| step.eligible_staff.is_empty() || step.eligible_staff.contains(id))
            .filter(|(id, _)| self.preferred_staff.map_or(true, |p| p == **id))
            .filter(|(id, _)| {
                !assigned
                    .iter()
                    .any(|a| a.staff_id == Some(**id) && a.range.overlaps(range))
            })
            .filter_map(|(id, free)| {
                find_containing(free, blocked).map(|iv| {
                    let idle = (blocked.start - iv.start) + (iv.end - blocked.end);
                    (*id, idle.num_minutes())
                })
            })
            .min_by_key(|(id, gap)| (Some(*id) != previous, *gap, *id))
            .map(|(id, _)| id)
    }

    fn pick_resource(
        &self,
        step: &ServiceStep,
        range: &TimeRange,
        blocked: &TimeRange,
        assigned: &[StepAssignment],
    ) -> Option<DbId> {
        step.resource_ids.iter().copied().find(|id| {
            let taken_by_this_booking = assigned
                .iter()
                .any(|a| a.resource_id == Some(*id) && a.range.overlaps(range));
            !taken_by_this_booking
                && self
                    .plan
                    .resource_free
                    .get(id)
                    .is_some_and(|free| find_containing(free, blocked).is_some())
        })
    }

    /// Minutes of unsellable idle time the booking leaves around it in the
    /// calendars of the staff it uses.
    fn waste(&self, assignments: &[StepAssignment]) -> i64 {
        let mut staff_ids: Vec<DbId> = assignments.iter().filter_map(|a| a.staff_id).collect();
        staff_ids.sort_unstable();
        staff_ids.dedup();

        let mut total = 0;
        for staff_id in staff_ids {
            let blocks = assignments
                .iter()
                .filter(|a| a.staff_id == Some(staff_id))
                .map(|a| a.blocked);
            let first = blocks.clone().map(|b| b.start).min();
            let last = blocks.map(|b| b.end).max();
            let (Some(first), Some(last)) = (first, last) else {
                continue;
            };
            let Some(free) = self.plan.staff_free.get(&staff_id) else {
                continue;
            };
            let Some(interval) = free.iter().find(|iv| iv.start <= first && last <= iv.end) else {
                continue;
            };
            for gap in [(first - interval.start).num_minutes(), (interval.end - last).num_minutes()] {
                if gap > 0 && gap < self.shortest_service {
                    total += gap;
                }
            }
        }
        total
    }

    /// Keep a smart slot only if it wastes strictly less than every grid
    /// slot within one granularity step of it.
    fn drop_unhelpful_smart_slots(&self, slots: Vec<Slot>) -> Vec<Slot> {
        let window = Duration::minutes(i64::from(self.inputs.location.granularity_minutes));
        let grid: Vec<(Timestamp, i64)> = slots
            .iter()
            .filter(|s| !s.smart)
            .map(|s| (s.start, s.waste_minutes))
            .collect();

        slots
            .into_iter()
            .filter(|slot| {
                !slot.smart
                    || grid
                        .iter()
                        .filter(|(start, _)| (*start - slot.start).abs() < window)
                        .all(|(_, waste)| slot.waste_minutes < *waste)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::inputs::{
        AvailabilityException, ExceptionKind, LocationRules, ResourcePool, StaffAvailability,
        TimeOff, WeeklyRule,
    };
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeZone, Utc};

    // 2026-03-02 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn r(h1: u32, m1: u32, h2: u32, m2: u32) -> TimeRange {
        TimeRange::new(at(h1, m1), at(h2, m2)).unwrap()
    }

    fn step(minutes: u32) -> ServiceStep {
        ServiceStep {
            duration_minutes: minutes,
            buffer_before_minutes: 0,
            buffer_after_minutes: 0,
            needs_staff: true,
            eligible_staff: vec![],
            resource_ids: vec![],
        }
    }

    fn service(id: DbId, steps: Vec<ServiceStep>) -> ServiceDefinition {
        ServiceDefinition { service_id: id, steps }
    }

    fn staff(id: DbId) -> StaffAvailability {
        StaffAvailability { staff_id: id, shifts: None, weekly: vec![] }
    }

    /// Monday 09:00-12:00, one staff, 30 minute grid, one 60 minute service.
    fn base_inputs() -> AvailabilityInputs {
        let mut location = LocationRules::new(1);
        location.granularity_minutes = 30;
        let mut inputs = AvailabilityInputs::new(location);
        inputs.opening_hours = vec![WeeklyRule { weekday: 0, open_minute: 540, close_minute: 720 }];
        inputs.staff = vec![staff(10)];
        inputs.services = vec![service(100, vec![step(60)])];
        inputs
    }

    fn request(service_ids: Vec<DbId>) -> AvailabilityRequest {
        AvailabilityRequest {
            service_ids,
            from: monday(),
            to: monday(),
            staff_id: None,
            now: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            exclude_appointment: None,
        }
    }

    fn starts(slots: &[Slot]) -> Vec<Timestamp> {
        slots.iter().map(|s| s.start).collect()
    }

    #[test]
    fn grid_slots_within_opening_hours() {
        let slots = find_availability(&base_inputs(), &request(vec![100])).unwrap();
        assert_eq!(starts(&slots), vec![at(9, 0), at(9, 30), at(10, 0), at(10, 30), at(11, 0)]);
        assert!(slots.iter().all(|s| !s.smart));
        assert_eq!(slots[0].end, at(10, 0));
        assert_eq!(slots[0].assignments[0].staff_id, Some(10));
    }

    #[test]
    fn existing_booking_blocks_overlapping_starts() {
        let mut inputs = base_inputs();
        inputs.bookings.push(BusyItem {
            appointment_id: Some(7),
            staff_id: Some(10),
            resource_id: None,
            range: r(10, 0, 11, 0),
        });
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert_eq!(starts(&slots), vec![at(9, 0), at(11, 0)]);
    }

    #[test]
    fn excluded_appointment_does_not_block() {
        let mut inputs = base_inputs();
        inputs.bookings.push(BusyItem {
            appointment_id: Some(7),
            staff_id: Some(10),
            resource_id: None,
            range: r(10, 0, 11, 0),
        });
        let mut req = request(vec![100]);
        req.exclude_appointment = Some(7);
        let slots = find_availability(&inputs, &req).unwrap();
        assert_eq!(slots.len(), 5);
    }

    #[test]
    fn buffers_must_fit_in_working_time() {
        let mut inputs = base_inputs();
        inputs.location.granularity_minutes = 15;
        inputs.opening_hours = vec![WeeklyRule { weekday: 0, open_minute: 540, close_minute: 600 }];
        let mut s = step(30);
        s.buffer_after_minutes = 15;
        inputs.services = vec![service(100, vec![s])];

        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert_eq!(starts(&slots), vec![at(9, 0), at(9, 15)]);
        assert_eq!(slots[0].assignments[0].blocked, r(9, 0, 9, 45));
    }

    #[test]
    fn lead_time_hides_near_slots() {
        let mut inputs = base_inputs();
        inputs.location.lead_time_minutes = 60;
        let mut req = request(vec![100]);
        req.now = at(9, 0);
        let slots = find_availability(&inputs, &req).unwrap();
        assert_eq!(starts(&slots), vec![at(10, 0), at(10, 30), at(11, 0)]);
    }

    #[test]
    fn horizon_hides_far_slots() {
        let mut inputs = base_inputs();
        inputs.location.horizon_days = 1;
        let mut req = request(vec![100]);
        req.now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 45, 0).unwrap();
        let slots = find_availability(&inputs, &req).unwrap();
        assert_eq!(starts(&slots), vec![at(9, 0), at(9, 30)]);
    }

    #[test]
    fn closed_exception_removes_day() {
        let mut inputs = base_inputs();
        inputs.exceptions.push(AvailabilityException {
            date: monday(),
            staff_id: None,
            kind: ExceptionKind::Closed,
        });
        assert!(find_availability(&inputs, &request(vec![100])).unwrap().is_empty());
    }

    #[test]
    fn open_exception_replaces_hours() {
        let mut inputs = base_inputs();
        inputs.exceptions.push(AvailabilityException {
            date: monday(),
            staff_id: None,
            kind: ExceptionKind::Open { open_minute: 14 * 60, close_minute: 15 * 60 },
        });
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert_eq!(starts(&slots), vec![at(14, 0)]);
    }

    #[test]
    fn staff_closed_exception_only_affects_that_staff() {
        let mut inputs = base_inputs();
        inputs.staff.push(staff(11));
        inputs.exceptions.push(AvailabilityException {
            date: monday(),
            staff_id: Some(10),
            kind: ExceptionKind::Closed,
        });
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert_eq!(slots.len(), 5);
        assert!(slots.iter().all(|s| s.staff_ids() == vec![11]));
    }

    #[test]
    fn time_off_removes_staff_and_location_time() {
        let mut inputs = base_inputs();
        inputs.time_off.push(TimeOff { staff_id: Some(10), range: r(9, 0, 10, 0) });
        inputs.time_off.push(TimeOff { staff_id: None, range: r(11, 30, 12, 0) });
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert_eq!(starts(&slots), vec![at(10, 0), at(10, 30)]);
    }

    #[test]
    fn shift_plan_overrides_weekly_rules() {
        let mut inputs = base_inputs();
        inputs.staff[0].weekly = vec![WeeklyRule { weekday: 0, open_minute: 540, close_minute: 720 }];
        inputs.staff[0].shifts = Some(vec![r(10, 0, 11, 0)]);
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert_eq!(starts(&slots), vec![at(10, 0)]);
    }

    #[test]
    fn empty_shift_plan_means_not_working() {
        let mut inputs = base_inputs();
        inputs.staff[0].shifts = Some(vec![]);
        assert!(find_availability(&inputs, &request(vec![100])).unwrap().is_empty());
    }

    #[test]
    fn staff_weekly_rules_are_clipped_to_opening_hours() {
        let mut inputs = base_inputs();
        inputs.staff[0].weekly = vec![WeeklyRule { weekday: 0, open_minute: 660, close_minute: 900 }];
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert_eq!(starts(&slots), vec![at(11, 0)]);
    }

    #[test]
    fn services_are_booked_back_to_back() {
        let mut inputs = base_inputs();
        inputs.opening_hours = vec![WeeklyRule { weekday: 0, open_minute: 540, close_minute: 600 }];
        inputs.services = vec![service(100, vec![step(30)]), service(101, vec![step(30)])];
        let slots = find_availability(&inputs, &request(vec![100, 101])).unwrap();
        assert_eq!(starts(&slots), vec![at(9, 0)]);
        let slot = &slots[0];
        assert_eq!(slot.end, at(10, 0));
        assert_eq!(slot.assignments.len(), 2);
        assert_eq!(slot.assignments[1].range, r(9, 30, 10, 0));
    }

    #[test]
    fn multi_staff_steps_use_eligible_staff() {
        let mut inputs = base_inputs();
        inputs.staff.push(staff(11));
        let mut cut = step(30);
        cut.eligible_staff = vec![10];
        let mut color = step(30);
        color.eligible_staff = vec![11];
        inputs.services = vec![service(100, vec![cut, color])];

        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert!(!slots.is_empty());
        assert_eq!(slots[0].staff_ids(), vec![10, 11]);
    }

    #[test]
    fn continuity_prefers_previous_staff() {
        let mut inputs = base_inputs();
        inputs.staff.push(staff(5));
        inputs.services = vec![service(100, vec![step(30), step(30)])];
        // Staff 5 is busy for the first step only, so staff 10 takes it and
        // keeps the second step even though staff 5 has the lower id.
        inputs.bookings.push(BusyItem {
            appointment_id: Some(1),
            staff_id: Some(5),
            resource_id: None,
            range: r(9, 0, 9, 30),
        });
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert_eq!(slots[0].start, at(9, 0));
        assert_eq!(slots[0].staff_ids(), vec![10]);
    }

    #[test]
    fn preferred_staff_is_required() {
        let mut inputs = base_inputs();
        inputs.staff.push(staff(11));
        inputs.bookings.push(BusyItem {
            appointment_id: Some(1),
            staff_id: Some(11),
            resource_id: None,
            range: r(9, 0, 11, 0),
        });
        let mut req = request(vec![100]);
        req.staff_id = Some(11);
        let slots = find_availability(&inputs, &req).unwrap();
        assert_eq!(starts(&slots), vec![at(11, 0)]);
        assert!(slots.iter().all(|s| s.staff_ids() == vec![11]));
    }

    #[test]
    fn processing_step_needs_only_its_resource() {
        let mut inputs = base_inputs();
        let apply = step(30);
        let mut process = step(30);
        process.needs_staff = false;
        process.resource_ids = vec![500];
        inputs.services = vec![service(100, vec![apply, process])];
        inputs.resources = vec![ResourcePool { resource_id: 500, capacity: 1 }];
        inputs.bookings.push(BusyItem {
            appointment_id: Some(1),
            staff_id: None,
            resource_id: Some(500),
            range: r(9, 30, 10, 0),
        });

        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert!(!starts(&slots).contains(&at(9, 0)));
        let slot = slots.iter().find(|s| s.start == at(9, 30)).unwrap();
        assert_eq!(slot.assignments[1].staff_id, None);
        assert_eq!(slot.assignments[1].resource_id, Some(500));
    }

    #[test]
    fn resource_capacity_allows_parallel_use() {
        let mut inputs = base_inputs();
        let mut s = step(60);
        s.resource_ids = vec![500];
        inputs.services = vec![service(100, vec![s])];
        inputs.resources = vec![ResourcePool { resource_id: 500, capacity: 2 }];
        inputs.bookings.push(BusyItem {
            appointment_id: Some(1),
            staff_id: None,
            resource_id: Some(500),
            range: r(9, 0, 12, 0),
        });
        assert_eq!(find_availability(&inputs, &request(vec![100])).unwrap().len(), 5);

        inputs.resources[0].capacity = 1;
        assert!(find_availability(&inputs, &request(vec![100])).unwrap().is_empty());
    }

    #[test]
    fn smart_slot_sits_flush_against_booking() {
        let mut inputs = base_inputs();
        inputs.services = vec![service(100, vec![step(40)])];
        inputs.bookings.push(BusyItem {
            appointment_id: Some(1),
            staff_id: Some(10),
            resource_id: None,
            range: r(9, 0, 9, 20),
        });

        let plain = find_availability(&inputs, &request(vec![100])).unwrap();
        assert!(!starts(&plain).contains(&at(9, 20)));

        inputs.location.smart_slots = true;
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        let smart = slots.iter().find(|s| s.start == at(9, 20)).unwrap();
        assert!(smart.smart);
        assert_eq!(smart.waste_minutes, 0);

        let grid = slots.iter().find(|s| s.start == at(9, 30)).unwrap();
        assert_eq!(grid.waste_minutes, 10);

        let closing = slots.iter().find(|s| s.start == at(11, 20)).unwrap();
        assert!(closing.smart);
    }

    #[test]
    fn smart_slot_dropped_when_grid_is_as_good() {
        let mut inputs = base_inputs();
        inputs.location.smart_slots = true;
        inputs.services.push(service(101, vec![step(15)]));
        // Shift starts off-grid at 09:10; the 09:30 grid slot leaves a 20 minute
        // gap which is shorter than the 60 minute service, so the 09:10 smart
        // slot wins. The 15 minute service is on offer but not requested.
        inputs.staff[0].shifts = Some(vec![r(9, 10, 12, 0)]);
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert!(slots.iter().any(|s| s.start == at(9, 10) && s.smart));

        // Once it is requested, a 20 minute gap is sellable and the smart
        // slot no longer improves anything.
        let slots = find_availability(&inputs, &request(vec![100, 101])).unwrap();
        assert!(!slots.iter().any(|s| s.start == at(9, 10)));
    }

    #[test]
    fn waste_threshold_ignores_unrequested_services() {
        let mut inputs = base_inputs();
        inputs.location.granularity_minutes = 15;
        inputs.services.push(service(101, vec![step(15)]));

        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        let slot = slots.iter().find(|s| s.start == at(9, 30)).unwrap();
        // 30 idle minutes before it, 90 after; only the first is too short
        // for another 60 minute booking.
        assert_eq!(slot.waste_minutes, 30);
        assert_eq!(slots.iter().find(|s| s.start == at(9, 0)).unwrap().waste_minutes, 0);
    }

    #[test]
    fn tightest_fit_counts_idle_time_on_both_sides() {
        let mut inputs = base_inputs();
        inputs.staff.push(staff(5));
        // Staff 10 is free 09:00-10:00 only; staff 5 all morning. Both are
        // flush at 09:00, but only staff 10 is left with no idle time after.
        inputs.bookings.push(BusyItem {
            appointment_id: Some(1),
            staff_id: Some(10),
            resource_id: None,
            range: r(10, 0, 12, 0),
        });
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert_eq!(slots[0].start, at(9, 0));
        assert_eq!(slots[0].staff_ids(), vec![10]);
    }

    #[test]
    fn max_slots_truncates() {
        let mut inputs = base_inputs();
        inputs.location.max_slots = 2;
        let slots = find_availability(&inputs, &request(vec![100])).unwrap();
        assert_eq!(starts(&slots), vec![at(9, 0), at(9, 30)]);
    }

    #[test]
    fn slots_span_multiple_days() {
        let mut inputs = base_inputs();
        inputs.opening_hours.push(WeeklyRule { weekday: 1, open_minute: 540, close_minute: 600 });
        let mut req = request(vec![100]);
        req.to = monday().succ_opt().unwrap();
        let slots = find_availability(&inputs, &req).unwrap();
        assert_eq!(slots.len(), 6);
        assert_eq!(slots[5].start, Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap());
    }

    #[test]
    fn slot_keys_are_unique_per_slot() {
        let slots = find_availability(&base_inputs(), &request(vec![100])).unwrap();
        let mut keys: Vec<&str> = slots.iter().map(|s| s.slot_key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), slots.len());
    }

    #[test]
    fn empty_service_list_is_rejected() {
        assert_matches!(
            find_availability(&base_inputs(), &request(vec![])),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn unknown_service_is_not_found() {
        assert_matches!(
            find_availability(&base_inputs(), &request(vec![999])),
            Err(CoreError::NotFound { entity: "Service", id: 999 })
        );
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut req = request(vec![100]);
        req.to = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_matches!(find_availability(&base_inputs(), &req), Err(CoreError::Validation(_)));
    }
}
