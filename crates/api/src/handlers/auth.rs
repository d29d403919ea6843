//! Handlers for the `/auth` resource.

use axum::extract::State;
use axum::Json;
use salon_core::error::CoreError;
use salon_core::types::DbId;
use salon_db::repositories::StaffRepo;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::generate_access_token;
use crate::auth::pin::{validate_pin, verify_pin};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /auth/pin`.
#[derive(Debug, Deserialize)]
pub struct PinLoginRequest {
    pub location_id: DbId,
    pub staff_id: DbId,
    pub pin: String,
}

#[derive(Debug, Serialize)]
pub struct PinLoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    pub staff: StaffInfo,
}

#[derive(Debug, Serialize)]
pub struct StaffInfo {
    pub id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub location_id: DbId,
    /// Role held at `location_id`.
    pub role: String,
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized("Invalid staff or PIN".into()))
}

/// POST /api/v1/auth/pin
///
/// Exchange a staff PIN for a token scoped to one location.
pub async fn pin_login(
    State(state): State<AppState>,
    Json(input): Json<PinLoginRequest>,
) -> AppResult<Json<DataResponse<PinLoginResponse>>> {
    validate_pin(&input.pin)?;

    let staff = StaffRepo::find_by_id(&state.pool, input.staff_id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(invalid_credentials)?;
    let pin_hash = staff.pin_hash.as_deref().ok_or_else(invalid_credentials)?;

    let valid = verify_pin(&input.pin, pin_hash)
        .map_err(|e| AppError::InternalError(format!("PIN verification error: {e}")))?;
    if !valid {
        tracing::info!(staff_id = staff.id, location_id = input.location_id, "PIN login rejected");
        return Err(invalid_credentials());
    }

    let role = StaffRepo::role_at(
        &state.pool,
        staff.id,
        input.location_id,
        state.memberships.staff,
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Forbidden(
            "Staff member does not work at this location".into(),
        ))
    })?;

    let access_token = generate_access_token(staff.id, input.location_id, &role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    tracing::info!(staff_id = staff.id, location_id = input.location_id, %role, "Staff logged in");
    Ok(Json(DataResponse {
        data: PinLoginResponse {
            access_token,
            token_type: "Bearer",
            expires_in: state.config.jwt.expires_in_secs(),
            staff: StaffInfo {
                id: staff.id,
                first_name: staff.first_name,
                last_name: staff.last_name,
                location_id: input.location_id,
                role,
            },
        },
    }))
}
