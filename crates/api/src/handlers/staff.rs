//! Handlers for the `/staff` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use salon_core::error::CoreError;
use salon_core::roles::{can_manage, is_known_role, ROLE_OWNER};
use salon_core::types::DbId;
use salon_db::models::staff::{CreateStaff, LocationStaff, Staff, StaffMembership};
use salon_db::repositories::{MembershipRepo, StaffRepo};
use serde::Deserialize;
use validator::Validate;

use crate::auth::pin::{hash_pin, validate_pin};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthStaff;
use crate::middleware::rbac::RequireManager;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /staff`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStaffRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
    pub pin: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Body of `PUT /staff/{id}/pin`.
#[derive(Debug, Deserialize)]
pub struct SetPinRequest {
    pub pin: String,
}

/// Body of `POST /staff/{id}/memberships`.
#[derive(Debug, Deserialize)]
pub struct AddMembershipRequest {
    pub role: Option<String>,
}

/// Owners may hand out any role; managers may not create owners.
fn ensure_assignable(caller: &AuthStaff, role: &str) -> AppResult<()> {
    if !is_known_role(role) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown role: {role}"
        ))));
    }
    if role == ROLE_OWNER && caller.role != ROLE_OWNER {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only owners may assign the owner role".into(),
        )));
    }
    Ok(())
}

/// GET /api/v1/staff
pub async fn list(
    auth: AuthStaff,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<LocationStaff>>>> {
    let staff =
        StaffRepo::list_for_location(&state.pool, auth.location_id, state.memberships.staff)
            .await?;
    Ok(Json(DataResponse { data: staff }))
}

/// POST /api/v1/staff
pub async fn create(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Json(input): Json<CreateStaffRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Staff>>)> {
    input.validate()?;
    if let Some(role) = input.role.as_deref() {
        ensure_assignable(&auth, role)?;
    }
    let pin_hash = match input.pin.as_deref() {
        Some(pin) => {
            validate_pin(pin)?;
            Some(hash_pin(pin).map_err(|e| AppError::InternalError(format!("PIN hashing error: {e}")))?)
        }
        None => None,
    };

    let mut staff = StaffRepo::create(
        &state.pool,
        auth.location_id,
        &CreateStaff {
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: input.email,
            role: input.role,
            metadata: input.metadata,
        },
    )
    .await?;
    if let Some(hash) = pin_hash {
        StaffRepo::set_pin_hash(&state.pool, staff.id, &hash).await?;
        staff.pin_hash = Some(hash);
    }

    tracing::info!(
        staff_id = staff.id,
        location_id = auth.location_id,
        created_by = auth.staff_id,
        "Staff member created"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: staff })))
}

/// PUT /api/v1/staff/{id}/pin
///
/// Staff may change their own PIN; managers may reset anyone's at their location.
pub async fn set_pin(
    auth: AuthStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SetPinRequest>,
) -> AppResult<StatusCode> {
    if id != auth.staff_id && !can_manage(&auth.role) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only managers may change another staff member's PIN".into(),
        )));
    }
    validate_pin(&input.pin)?;
    StaffRepo::role_at(&state.pool, id, auth.location_id, state.memberships.staff)
        .await?
        .ok_or(AppError::not_found("Staff", id))?;

    let hash =
        hash_pin(&input.pin).map_err(|e| AppError::InternalError(format!("PIN hashing error: {e}")))?;
    if !StaffRepo::set_pin_hash(&state.pool, id, &hash).await? {
        return Err(AppError::not_found("Staff", id));
    }
    tracing::info!(staff_id = id, changed_by = auth.staff_id, "Staff PIN changed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/staff/{id}/memberships
///
/// Let a staff member from another location work at the caller's location.
pub async fn add_membership(
    RequireManager(auth): RequireManager,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AddMembershipRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<StaffMembership>>)> {
    if !state.memberships.staff {
        return Err(AppError::Core(CoreError::Validation(
            "This database does not support multi-location staff".into(),
        )));
    }
    let role = input.role.as_deref().unwrap_or(salon_core::roles::ROLE_STAFF);
    ensure_assignable(&auth, role)?;

    let staff = StaffRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|s| s.is_active)
        .ok_or(AppError::not_found("Staff", id))?;
    if staff.location_id == auth.location_id {
        return Err(AppError::Core(CoreError::Validation(
            "Staff member already works at this location".into(),
        )));
    }

    let membership = MembershipRepo::upsert_staff(&state.pool, staff.id, auth.location_id, role).await?;
    tracing::info!(
        staff_id = staff.id,
        location_id = auth.location_id,
        %role,
        "Staff membership added"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: membership })))
}
