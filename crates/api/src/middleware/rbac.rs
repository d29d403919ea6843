//! Role checks layered on [`AuthStaff`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use salon_core::error::CoreError;
use salon_core::roles::can_manage;

use super::auth::AuthStaff;
use crate::error::AppError;
use crate::state::AppState;

/// Requires `owner` or `manager` at the token's location. 403 otherwise.
///
/// ```ignore
/// async fn replace_hours(RequireManager(staff): RequireManager) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireManager(pub AuthStaff);

impl FromRequestParts<AppState> for RequireManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let staff = AuthStaff::from_request_parts(parts, state).await?;
        if !can_manage(&staff.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Manager or owner role required".into(),
            )));
        }
        Ok(RequireManager(staff))
    }
}
