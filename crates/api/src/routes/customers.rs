//! Route definitions for the `/customers` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::customers;
use crate::state::AppState;

/// Routes mounted at `/customers`.
///
/// ```text
/// GET   /                -> list (?q=&limit=)
/// POST  /                -> create
/// GET   /{id}            -> get_by_id
/// PATCH /{id}            -> update
/// GET   /{id}/consents   -> list_consents
/// POST  /{id}/consents   -> record_consent
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(customers::list).post(customers::create))
        .route("/{id}", get(customers::get_by_id).patch(customers::update))
        .route(
            "/{id}/consents",
            get(customers::list_consents).post(customers::record_consent),
        )
}
