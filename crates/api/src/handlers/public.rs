//! Unauthenticated endpoints used by the online booking widget.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use salon_core::availability::{AvailabilityRequest, Slot};
use salon_core::checkout::CheckoutInput;
use salon_core::types::DbId;

use crate::booking::availability::{find_slots, load_location, Audience};
use crate::booking::checkout::{checkout as run_checkout, CheckoutOutcome};
use crate::error::{AppError, AppResult};
use crate::query::AvailabilityParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/public/locations/{id}/availability
pub async fn availability(
    State(state): State<AppState>,
    Path(location_id): Path<DbId>,
    Query(params): Query<AvailabilityParams>,
) -> AppResult<Json<DataResponse<Vec<Slot>>>> {
    if params.to < params.from {
        return Err(AppError::BadRequest("'to' must not be before 'from'".into()));
    }
    let location = load_location(&state, location_id).await?;
    let request = AvailabilityRequest {
        service_ids: params.service_ids()?,
        from: params.from,
        to: params.to,
        staff_id: params.staff_id,
        now: Utc::now(),
        exclude_appointment: None,
    };
    let slots = find_slots(&state, &location, &request, Audience::Online).await?;
    Ok(Json(DataResponse { data: slots }))
}

/// POST /api/v1/public/locations/{id}/checkout
///
/// 201 for a new booking, 200 when the idempotency key replays an earlier one.
pub async fn checkout(
    State(state): State<AppState>,
    Path(location_id): Path<DbId>,
    Json(input): Json<CheckoutInput>,
) -> AppResult<(StatusCode, Json<DataResponse<CheckoutOutcome>>)> {
    let outcome = run_checkout(&state, location_id, &input).await?;
    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(DataResponse { data: outcome })))
}
