//! Building an [`AvailabilityInputs`] snapshot for one location.

use chrono::NaiveDate;
use salon_core::availability::{
    find_availability, local_day, AvailabilityInputs, AvailabilityRequest, Slot,
    StaffAvailability,
};
use salon_core::error::CoreError;
use salon_core::intervals::TimeRange;
use salon_core::metadata::StaffMetadata;
use salon_core::types::DbId;
use salon_db::models::appointment::AppointmentItem;
use salon_db::models::location::Location;
use salon_db::models::schedule::{ExceptionEntry, TimeOffEntry, WeeklyHours};
use salon_db::models::service::Resource;
use salon_db::models::staff::LocationStaff;
use salon_db::repositories::{
    AppointmentItemRepo, ExceptionRepo, LocationRepo, ResourceRepo, ServiceRepo, StaffRepo,
    TimeOffRepo, WeeklyHoursRepo,
};
use salon_shiftplan::{ShiftPlanProvider, Shifts};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Who is asking. Online searches only see services and staff flagged
/// as bookable online.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Online,
    Backoffice,
}

pub async fn load_location(state: &AppState, location_id: DbId) -> AppResult<Location> {
    LocationRepo::find_by_id(&state.pool, location_id)
        .await?
        .ok_or(AppError::not_found("Location", location_id))
}

/// Compute slots for `request` at `location`.
pub async fn find_slots(
    state: &AppState,
    location: &Location,
    request: &AvailabilityRequest,
    audience: Audience,
) -> AppResult<Vec<Slot>> {
    if request.service_ids.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "At least one service is required".into(),
        )));
    }
    let inputs = load_inputs(
        state,
        location,
        &request.service_ids,
        request.from,
        request.to,
        audience,
    )
    .await?;
    let slots = find_availability(&inputs, request)?;
    tracing::debug!(
        location_id = location.id,
        from = %request.from,
        to = %request.to,
        slots = slots.len(),
        "Computed availability"
    );
    Ok(slots)
}

/// Load everything that constrains `location`'s calendar between the local
/// dates `from` and `to`.
pub async fn load_inputs(
    state: &AppState,
    location: &Location,
    service_ids: &[DbId],
    from: NaiveDate,
    to: NaiveDate,
    audience: Audience,
) -> AppResult<AvailabilityInputs> {
    let pool = &state.pool;
    let rules = location.rules();
    let window = TimeRange::new(
        local_day(from, rules.utc_offset_minutes).start,
        local_day(to.max(from), rules.utc_offset_minutes).end,
    )?;

    let (services, qualified, staff, hours, time_off, exceptions, resources) = futures::try_join!(
        ServiceRepo::list_active(pool, location.id),
        ServiceRepo::qualified_staff(pool, service_ids),
        StaffRepo::list_for_location(pool, location.id, state.memberships.staff),
        WeeklyHoursRepo::list_for_location(pool, location.id),
        TimeOffRepo::list_overlapping(pool, location.id, window),
        ExceptionRepo::list_between(pool, location.id, from, to),
        ResourceRepo::list_active(pool, location.id),
    )?;

    let staff: Vec<LocationStaff> = staff
        .into_iter()
        .filter(|s| audience == Audience::Backoffice || StaffMetadata::from_value(&s.metadata).bookable_online)
        .collect();
    let staff_ids: Vec<DbId> = staff.iter().map(|s| s.id).collect();

    let busy = AppointmentItemRepo::busy_in_range(pool, location.id, window, &staff_ids).await?;
    let shifts = fetch_shifts(state.shift_plan.as_ref(), &staff, window).await;

    let mut inputs = AvailabilityInputs::new(rules);
    inputs.opening_hours = hours
        .iter()
        .filter(|h| h.staff_id.is_none())
        .map(WeeklyHours::rule)
        .collect();
    inputs.staff = staff
        .iter()
        .map(|s| StaffAvailability {
            staff_id: s.id,
            shifts: StaffMetadata::from_value(&s.metadata)
                .shift_plan_employee_id
                .and_then(|employee| shifts.get(&employee).cloned()),
            weekly: hours
                .iter()
                .filter(|h| h.staff_id == Some(s.id))
                .map(WeeklyHours::rule)
                .collect(),
        })
        .collect();
    inputs.exceptions = exceptions.iter().filter_map(ExceptionEntry::exception).collect();
    inputs.time_off = time_off.iter().filter_map(TimeOffEntry::time_off).collect();
    inputs.bookings = busy
        .iter()
        .map(AppointmentItem::busy)
        .collect::<Result<_, _>>()?;
    inputs.resources = resources.iter().map(Resource::pool).collect();
    inputs.services = services
        .iter()
        .filter(|s| service_ids.contains(&s.id))
        .filter(|s| audience == Audience::Backoffice || s.bookable_online)
        .map(|s| {
            let qualified: Vec<DbId> = qualified
                .iter()
                .filter(|(service_id, _)| *service_id == s.id)
                .map(|(_, staff_id)| *staff_id)
                .collect();
            s.definition(&qualified)
        })
        .collect::<Result<_, _>>()?;

    Ok(inputs)
}

/// Shifts for the staff that have a shift-plan employee id.
///
/// A provider failure degrades to an empty map: every staff member then
/// falls back to their weekly hours.
async fn fetch_shifts(
    provider: &dyn ShiftPlanProvider,
    staff: &[LocationStaff],
    window: TimeRange,
) -> Shifts {
    let employee_ids: Vec<String> = staff
        .iter()
        .filter_map(|s| StaffMetadata::from_value(&s.metadata).shift_plan_employee_id)
        .collect();
    if employee_ids.is_empty() {
        return Shifts::new();
    }

    match provider.fetch_shifts(&employee_ids, window).await {
        Ok(shifts) => shifts,
        Err(e) => {
            tracing::warn!(
                error = %e,
                employees = employee_ids.len(),
                "Shift plan unavailable, falling back to weekly hours"
            );
            Shifts::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use salon_shiftplan::{ShiftPlanError, StaticShiftPlan};
    use serde_json::json;

    use super::*;

    struct Unreachable;

    #[async_trait]
    impl ShiftPlanProvider for Unreachable {
        async fn fetch_shifts(
            &self,
            _employee_ids: &[String],
            _range: TimeRange,
        ) -> Result<Shifts, ShiftPlanError> {
            Err(ShiftPlanError::HttpStatus(503))
        }
    }

    fn member(id: DbId, metadata: serde_json::Value) -> LocationStaff {
        LocationStaff {
            id,
            first_name: "Kim".into(),
            last_name: "Berg".into(),
            role: "staff".into(),
            metadata,
            is_active: true,
        }
    }

    fn window() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn provider_failure_yields_no_shifts() {
        let staff = [member(1, json!({ "shift_plan_employee_id": "E-1" }))];
        let shifts = fetch_shifts(&Unreachable, &staff, window()).await;
        assert!(shifts.is_empty());
    }

    #[tokio::test]
    async fn staff_without_employee_id_is_not_queried() {
        let plan = StaticShiftPlan::new(HashMap::new()).with_shifts("E-1", vec![window()]);
        let staff = [
            member(1, json!({ "shift_plan_employee_id": "E-1" })),
            member(2, json!({})),
        ];
        let shifts = fetch_shifts(&plan, &staff, window()).await;
        assert_eq!(shifts.len(), 1);
        assert_eq!(shifts["E-1"], vec![window()]);
    }
}
