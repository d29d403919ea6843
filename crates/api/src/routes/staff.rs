//! Route definitions for the `/staff` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::staff;
use crate::state::AppState;

/// Routes mounted at `/staff`.
///
/// ```text
/// GET  /                   -> list
/// POST /                   -> create (manager)
/// PUT  /{id}/pin           -> set_pin
/// POST /{id}/memberships   -> add_membership (manager)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(staff::list).post(staff::create))
        .route("/{id}/pin", put(staff::set_pin))
        .route("/{id}/memberships", post(staff::add_membership))
}
