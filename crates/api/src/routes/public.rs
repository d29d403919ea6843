//! Route definitions for the unauthenticated `/public` tree.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::public;
use crate::state::AppState;

/// Routes mounted at `/public`.
///
/// ```text
/// GET  /locations/{id}/availability   -> availability
/// POST /locations/{id}/checkout       -> checkout
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/locations/{id}/availability", get(public::availability))
        .route("/locations/{id}/checkout", post(public::checkout))
}
