//! Handlers for the `/schedule` resource: weekly hours, time off and
//! date exceptions. Reads are open to all staff; edits need a manager.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use salon_core::availability::inputs::validate_minutes;
use salon_core::availability::ExceptionKind;
use salon_core::error::CoreError;
use salon_core::types::DbId;
use salon_db::models::schedule::{
    CreateException, CreateTimeOff, ExceptionEntry, TimeOffEntry, WeeklyHours, WeeklyWindow,
};
use salon_db::repositories::{ExceptionRepo, StaffRepo, TimeOffRepo, WeeklyHoursRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthStaff;
use crate::middleware::rbac::RequireManager;
use crate::query::{DateRangeParams, RangeParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// `?staff_id=`; absent means the location's own hours.
#[derive(Debug, Deserialize)]
pub struct HoursParams {
    pub staff_id: Option<DbId>,
}

/// Body of `POST /schedule/opening-hours`. Replaces every window of the
/// location (or of `staff_id`).
#[derive(Debug, Deserialize)]
pub struct ReplaceHoursRequest {
    pub staff_id: Option<DbId>,
    pub windows: Vec<WeeklyWindow>,
}

async fn ensure_staff_here(state: &AppState, auth: &AuthStaff, staff_id: Option<DbId>) -> AppResult<()> {
    if let Some(staff_id) = staff_id {
        StaffRepo::role_at(&state.pool, staff_id, auth.location_id, state.memberships.staff)
            .await?
            .ok_or(AppError::not_found("Staff", staff_id))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Weekly hours
// ---------------------------------------------------------------------------

/// GET /api/v1/schedule/opening-hours?staff_id=
pub async fn list_hours(
    auth: AuthStaff,
    State(state): State<AppState>,
    Query(params): Query<HoursParams>,
) -> AppResult<Json<DataResponse<Vec<WeeklyHours>>>> {
    let hours = WeeklyHoursRepo::list_for_location(&state.pool, auth.location_id)
        .await?
        .into_iter()
        .filter(|h| h.staff_id == params.staff_id)
        .collect();
    Ok(Json(DataResponse { data: hours }))
}

/// POST /api/v1/schedule/opening-hours
pub async fn replace_hours(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Json(input): Json<ReplaceHoursRequest>,
) -> AppResult<Json<DataResponse<Vec<WeeklyHours>>>> {
    for window in &input.windows {
        window.rule().validate()?;
    }
    ensure_staff_here(&state, &auth, input.staff_id).await?;

    let hours =
        WeeklyHoursRepo::replace(&state.pool, auth.location_id, input.staff_id, &input.windows)
            .await?;
    tracing::info!(
        location_id = auth.location_id,
        staff_id = ?input.staff_id,
        windows = hours.len(),
        "Weekly hours replaced"
    );
    Ok(Json(DataResponse { data: hours }))
}

// ---------------------------------------------------------------------------
// Time off
// ---------------------------------------------------------------------------

/// GET /api/v1/schedule/time-off?from=&to=&staff_id=
pub async fn list_time_off(
    auth: AuthStaff,
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> AppResult<Json<DataResponse<Vec<TimeOffEntry>>>> {
    let range = params.range()?;
    let entries = TimeOffRepo::list_overlapping(&state.pool, auth.location_id, range)
        .await?
        .into_iter()
        .filter(|e| params.staff_id.is_none() || e.staff_id == params.staff_id)
        .collect();
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/schedule/time-off
pub async fn create_time_off(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Json(input): Json<CreateTimeOff>,
) -> AppResult<(StatusCode, Json<DataResponse<TimeOffEntry>>)> {
    if input.ends_at <= input.starts_at {
        return Err(AppError::Core(CoreError::Validation(
            "Time off must end after it starts".into(),
        )));
    }
    ensure_staff_here(&state, &auth, input.staff_id).await?;

    let entry = TimeOffRepo::create(&state.pool, auth.location_id, &input).await?;
    tracing::info!(time_off_id = entry.id, staff_id = ?entry.staff_id, "Time off created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// DELETE /api/v1/schedule/time-off/{id}
pub async fn delete_time_off(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if TimeOffRepo::delete(&state.pool, auth.location_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("TimeOff", id))
    }
}

// ---------------------------------------------------------------------------
// Exceptions
// ---------------------------------------------------------------------------

/// GET /api/v1/schedule/exceptions?from=YYYY-MM-DD&to=YYYY-MM-DD
pub async fn list_exceptions(
    auth: AuthStaff,
    State(state): State<AppState>,
    Query(params): Query<DateRangeParams>,
) -> AppResult<Json<DataResponse<Vec<ExceptionEntry>>>> {
    if params.to < params.from {
        return Err(AppError::BadRequest("'to' must not be before 'from'".into()));
    }
    let entries =
        ExceptionRepo::list_between(&state.pool, auth.location_id, params.from, params.to).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/schedule/exceptions
pub async fn create_exception(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Json(input): Json<CreateException>,
) -> AppResult<(StatusCode, Json<DataResponse<ExceptionEntry>>)> {
    if let ExceptionKind::Open {
        open_minute,
        close_minute,
    } = input.kind
    {
        validate_minutes(open_minute, close_minute)?;
    }
    ensure_staff_here(&state, &auth, input.staff_id).await?;

    let entry = ExceptionRepo::create(&state.pool, auth.location_id, &input).await?;
    tracing::info!(exception_id = entry.id, date = %entry.exception_date, "Availability exception created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// DELETE /api/v1/schedule/exceptions/{id}
pub async fn delete_exception(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ExceptionRepo::delete(&state.pool, auth.location_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("AvailabilityException", id))
    }
}
