//! Double-booking checks that run inside the booking transaction.
//!
//! Availability is computed outside any transaction, so by the time a
//! booking commits someone else may have taken the time. These checks run
//! after the involved staff rows are locked.

use std::collections::HashMap;

use salon_core::availability::saturated_ranges;
use salon_core::error::CoreError;
use salon_core::intervals::TimeRange;
use salon_core::types::DbId;
use salon_db::models::appointment::NewAppointmentItem;
use salon_db::repositories::{AppointmentItemRepo, ResourceRepo, StaffRepo};
use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, AppResult};

/// Capacity per resource id.
pub type Capacities = HashMap<DbId, u32>;

pub async fn load_capacities(pool: &PgPool, location_id: DbId) -> AppResult<Capacities> {
    let resources = ResourceRepo::list_active(pool, location_id).await?;
    Ok(resources
        .iter()
        .map(|r| {
            let pool = r.pool();
            (pool.resource_id, pool.capacity)
        })
        .collect())
}

/// Lock the staff rows `items` touch, in id order.
pub async fn lock_staff(conn: &mut PgConnection, items: &[NewAppointmentItem]) -> AppResult<()> {
    let mut staff_ids: Vec<DbId> = items.iter().filter_map(|i| i.staff_id).collect();
    staff_ids.sort_unstable();
    staff_ids.dedup();
    if !staff_ids.is_empty() {
        StaffRepo::lock_for_update(conn, &staff_ids).await?;
    }
    Ok(())
}

/// Fail with `Conflict` when any of `items` collides with a live booking.
///
/// Staff may hold one item at a time. A resource may hold as many
/// overlapping items as its capacity. Items of `exclude_appointment` are
/// ignored, which is how an appointment is moved over its own old times.
///
/// Buffers count against other bookings only. Within `items` the same
/// rule as slot assignment applies, see [`ensure_no_self_overlap`].
pub async fn ensure_free(
    conn: &mut PgConnection,
    items: &[NewAppointmentItem],
    capacities: &Capacities,
    exclude_appointment: Option<DbId>,
) -> AppResult<()> {
    for (index, item) in items.iter().enumerate() {
        let blocked = item
            .blocked()
            .ok_or_else(|| CoreError::Validation("Item must end after it starts".into()))?;

        if let Some(staff_id) = item.staff_id {
            let taken =
                AppointmentItemRepo::overlapping_for_staff(conn, staff_id, blocked, exclude_appointment)
                    .await?;
            if !taken.is_empty() {
                return Err(conflict(format!("Staff {staff_id} is already booked at that time")));
            }
        }

        if let Some(resource_id) = item.resource_id {
            let capacity = capacities.get(&resource_id).copied().ok_or_else(|| {
                AppError::Core(CoreError::Validation(format!(
                    "Resource {resource_id} is not available at this location"
                )))
            })?;
            let existing = AppointmentItemRepo::overlapping_for_resource(
                conn,
                resource_id,
                blocked,
                exclude_appointment,
            )
            .await?;

            let occupied: Vec<TimeRange> = existing
                .iter()
                .map(|i| i.blocked())
                .collect::<Result<_, _>>()?;
            let shared_in_booking = items[..index]
                .iter()
                .filter(|other| other.resource_id == Some(resource_id))
                .any(|other| overlapping_service_time(other, item));

            if shared_in_booking
                || saturated_ranges(&occupied, capacity)
                    .iter()
                    .any(|full| full.overlaps(&blocked))
            {
                return Err(conflict(format!(
                    "Resource {resource_id} is fully booked at that time"
                )));
            }
        }
    }
    Ok(())
}

/// Fail when two of `items` give the same staff member overlapping work.
///
/// Only service time is compared: a buffer between two steps of one
/// appointment does not keep the staff member from the next step.
pub fn ensure_no_self_overlap(items: &[NewAppointmentItem]) -> AppResult<()> {
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            let same_staff = a.staff_id.is_some() && a.staff_id == b.staff_id;
            if same_staff && overlapping_service_time(a, b) {
                return Err(conflict("Items of one appointment overlap for the same staff".into()));
            }
        }
    }
    Ok(())
}

fn overlapping_service_time(a: &NewAppointmentItem, b: &NewAppointmentItem) -> bool {
    match (a.range(), b.range()) {
        (Some(x), Some(y)) => x.overlaps(&y),
        _ => false,
    }
}

fn conflict(message: String) -> AppError {
    AppError::Core(CoreError::Conflict(message))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn item(staff_id: Option<DbId>, start_h: u32, end_h: u32, buffer_after: i32) -> NewAppointmentItem {
        NewAppointmentItem {
            service_id: 1,
            staff_id,
            resource_id: None,
            starts_at: Utc.with_ymd_and_hms(2026, 3, 2, start_h, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 3, 2, end_h, 0, 0).unwrap(),
            buffer_before_minutes: 0,
            buffer_after_minutes: buffer_after,
        }
    }

    #[test]
    fn back_to_back_items_for_one_staff_are_fine() {
        assert!(ensure_no_self_overlap(&[item(Some(1), 9, 10, 0), item(Some(1), 10, 11, 0)]).is_ok());
    }

    #[test]
    fn buffer_before_next_step_is_not_an_overlap() {
        assert!(ensure_no_self_overlap(&[item(Some(1), 9, 10, 15), item(Some(1), 10, 11, 0)]).is_ok());
    }

    #[test]
    fn overlapping_service_time_conflicts() {
        let result = ensure_no_self_overlap(&[item(Some(1), 9, 11, 0), item(Some(1), 10, 12, 0)]);
        assert_matches!(result, Err(AppError::Core(CoreError::Conflict(_))));
    }

    #[test]
    fn engine_slot_with_buffered_steps_passes() {
        use salon_core::availability::{
            find_availability, AvailabilityInputs, AvailabilityRequest, LocationRules,
            ServiceDefinition, ServiceStep, StaffAvailability, WeeklyRule,
        };

        let step = |minutes: u32, buffer_after: u32| ServiceStep {
            duration_minutes: minutes,
            buffer_before_minutes: 0,
            buffer_after_minutes: buffer_after,
            needs_staff: true,
            eligible_staff: vec![],
            resource_ids: vec![],
        };
        let mut inputs = AvailabilityInputs::new(LocationRules::new(1));
        // 2026-03-02 is a Monday.
        inputs.opening_hours = vec![WeeklyRule { weekday: 0, open_minute: 540, close_minute: 720 }];
        inputs.staff = vec![StaffAvailability { staff_id: 10, shifts: None, weekly: vec![] }];
        inputs.services = vec![
            ServiceDefinition { service_id: 100, steps: vec![step(30, 10)] },
            ServiceDefinition { service_id: 101, steps: vec![step(30, 0)] },
        ];
        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let slots = find_availability(
            &inputs,
            &AvailabilityRequest {
                service_ids: vec![100, 101],
                from: date,
                to: date,
                staff_id: None,
                now: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
                exclude_appointment: None,
            },
        )
        .unwrap();
        assert!(!slots.is_empty());

        for slot in &slots {
            let items: Vec<NewAppointmentItem> =
                slot.assignments.iter().map(NewAppointmentItem::from_assignment).collect();
            assert_eq!(items[0].staff_id, items[1].staff_id);
            assert!(ensure_no_self_overlap(&items).is_ok());
        }
    }

    #[test]
    fn different_staff_may_overlap() {
        assert!(ensure_no_self_overlap(&[item(Some(1), 9, 11, 0), item(Some(2), 9, 11, 0)]).is_ok());
        assert!(ensure_no_self_overlap(&[item(None, 9, 11, 0), item(None, 9, 11, 0)]).is_ok());
    }
}
