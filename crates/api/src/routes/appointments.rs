//! Route definitions for the `/appointments` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::appointments;
use crate::state::AppState;

/// Routes mounted at `/appointments`.
///
/// ```text
/// GET    /                                -> list
/// POST   /                                -> create
/// GET    /{id}                            -> get_by_id
/// PATCH  /{id}                            -> update
/// POST   /{id}/reschedule                 -> reschedule
/// POST   /{id}/status                     -> change_status
/// POST   /{id}/payment-status             -> change_payment_status
/// POST   /{id}/items/{item_id}/split      -> split_item
/// POST   /{id}/items/merge                -> merge_items
/// DELETE /{id}/items/{item_id}            -> delete_item
/// POST   /{id}/repeat                     -> repeat
/// POST   /{id}/series                     -> change_series
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(appointments::list).post(appointments::create))
        .route(
            "/{id}",
            get(appointments::get_by_id).patch(appointments::update),
        )
        .route("/{id}/reschedule", post(appointments::reschedule))
        .route("/{id}/status", post(appointments::change_status))
        .route(
            "/{id}/payment-status",
            post(appointments::change_payment_status),
        )
        .route("/{id}/items/merge", post(appointments::merge_items))
        .route("/{id}/items/{item_id}/split", post(appointments::split_item))
        .route("/{id}/items/{item_id}", delete(appointments::delete_item))
        .route("/{id}/repeat", post(appointments::repeat))
        .route("/{id}/series", post(appointments::change_series))
}
