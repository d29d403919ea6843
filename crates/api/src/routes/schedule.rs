//! Route definitions for the `/schedule` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::schedule;
use crate::state::AppState;

/// Routes mounted at `/schedule`.
///
/// ```text
/// GET    /opening-hours      -> list_hours (?staff_id=)
/// POST   /opening-hours      -> replace_hours (manager)
/// GET    /time-off           -> list_time_off (?from=&to=&staff_id=)
/// POST   /time-off           -> create_time_off (manager)
/// DELETE /time-off/{id}      -> delete_time_off (manager)
/// GET    /exceptions         -> list_exceptions (?from=&to=)
/// POST   /exceptions         -> create_exception (manager)
/// DELETE /exceptions/{id}    -> delete_exception (manager)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/opening-hours",
            get(schedule::list_hours).post(schedule::replace_hours),
        )
        .route(
            "/time-off",
            get(schedule::list_time_off).post(schedule::create_time_off),
        )
        .route("/time-off/{id}", delete(schedule::delete_time_off))
        .route(
            "/exceptions",
            get(schedule::list_exceptions).post(schedule::create_exception),
        )
        .route("/exceptions/{id}", delete(schedule::delete_exception))
}
