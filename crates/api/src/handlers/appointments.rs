//! Handlers for the `/appointments` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use salon_core::repeat::RepeatRule;
use salon_core::types::DbId;
use salon_db::models::appointment::{Appointment, AppointmentWithItems, UpdateAppointment};
use salon_db::repositories::AppointmentRepo;

use crate::booking::appointments::{
    self as booking, CreateAppointmentRequest, PaymentChangeRequest, RescheduleRequest,
    StatusChangeRequest,
};
use crate::booking::items::{self, MergeItemsRequest, SplitItemRequest};
use crate::booking::series::{self, SeriesChangeOutcome, SeriesChangeRequest, SeriesCreated};
use crate::error::AppResult;
use crate::middleware::auth::AuthStaff;
use crate::query::RangeParams;
use crate::response::DataResponse;
use crate::state::AppState;

type Single = Json<DataResponse<AppointmentWithItems>>;

fn single(appointment: AppointmentWithItems) -> Single {
    Json(DataResponse { data: appointment })
}

/// GET /api/v1/appointments?from=&to=&staff_id=
pub async fn list(
    auth: AuthStaff,
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> AppResult<Json<DataResponse<Vec<AppointmentWithItems>>>> {
    let range = params.range()?;
    let appointments =
        AppointmentRepo::list_in_range(&state.pool, auth.location_id, range, params.staff_id)
            .await?;
    let mut data = Vec::with_capacity(appointments.len());
    for appointment in appointments {
        data.push(booking::with_items(&state.pool, appointment).await?);
    }
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/appointments
pub async fn create(
    auth: AuthStaff,
    State(state): State<AppState>,
    Json(input): Json<CreateAppointmentRequest>,
) -> AppResult<(StatusCode, Single)> {
    let created = booking::create(&state, &auth, &input).await?;
    Ok((StatusCode::CREATED, single(created)))
}

/// GET /api/v1/appointments/{id}
pub async fn get_by_id(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Single> {
    let appointment = booking::load_at(&state, &auth, id).await?;
    Ok(single(booking::with_items(&state.pool, appointment).await?))
}

/// PATCH /api/v1/appointments/{id}
pub async fn update(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAppointment>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    let appointment = booking::update_details(&state, &auth, id, &input).await?;
    Ok(Json(DataResponse { data: appointment }))
}

/// POST /api/v1/appointments/{id}/reschedule
pub async fn reschedule(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RescheduleRequest>,
) -> AppResult<Single> {
    Ok(single(booking::reschedule(&state, &auth, id, &input).await?))
}

/// POST /api/v1/appointments/{id}/status
pub async fn change_status(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<StatusChangeRequest>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    let appointment = booking::change_status(&state, &auth, id, &input).await?;
    Ok(Json(DataResponse { data: appointment }))
}

/// POST /api/v1/appointments/{id}/payment-status
pub async fn change_payment_status(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<PaymentChangeRequest>,
) -> AppResult<Json<DataResponse<Appointment>>> {
    let appointment = booking::change_payment_status(&state, &auth, id, &input).await?;
    Ok(Json(DataResponse { data: appointment }))
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// POST /api/v1/appointments/{id}/items/{item_id}/split
pub async fn split_item(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(DbId, DbId)>,
    Json(input): Json<SplitItemRequest>,
) -> AppResult<Single> {
    Ok(single(items::split(&state, &auth, id, item_id, &input).await?))
}

/// POST /api/v1/appointments/{id}/items/merge
pub async fn merge_items(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<MergeItemsRequest>,
) -> AppResult<Single> {
    Ok(single(items::merge(&state, &auth, id, &input).await?))
}

/// DELETE /api/v1/appointments/{id}/items/{item_id}
pub async fn delete_item(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path((id, item_id)): Path<(DbId, DbId)>,
) -> AppResult<Single> {
    Ok(single(items::remove(&state, &auth, id, item_id).await?))
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// POST /api/v1/appointments/{id}/repeat
pub async fn repeat(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(rule): Json<RepeatRule>,
) -> AppResult<(StatusCode, Json<DataResponse<SeriesCreated>>)> {
    let created = series::create_series(&state, &auth, id, &rule).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// POST /api/v1/appointments/{id}/series
pub async fn change_series(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SeriesChangeRequest>,
) -> AppResult<Json<DataResponse<SeriesChangeOutcome>>> {
    let outcome = series::propagate(&state, &auth, id, &input).await?;
    Ok(Json(DataResponse { data: outcome }))
}
