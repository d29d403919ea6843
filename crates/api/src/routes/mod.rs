pub mod appointments;
pub mod auth;
pub mod customers;
pub mod health;
pub mod public;
pub mod schedule;
pub mod staff;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/pin                                        PIN login (public)
///
/// /public/locations/{id}/availability              slot search (public)
/// /public/locations/{id}/checkout                  online booking (public)
///
/// /appointments                                    list, create
/// /appointments/{id}                               get, update
/// /appointments/{id}/reschedule                    move all items
/// /appointments/{id}/status                        status change
/// /appointments/{id}/payment-status                payment status change
/// /appointments/{id}/items/{item_id}/split         split item (POST)
/// /appointments/{id}/items/merge                   merge items (POST)
/// /appointments/{id}/items/{item_id}               remove item (DELETE)
/// /appointments/{id}/repeat                        create repeat series
/// /appointments/{id}/series                        propagate change to series
///
/// /customers                                       search, create
/// /customers/{id}                                  get, update
/// /customers/{id}/consents                         history, record
///
/// /staff                                           list, create (manager)
/// /staff/{id}/pin                                  set PIN (PUT)
/// /staff/{id}/memberships                          add to location (manager)
///
/// /schedule/opening-hours                          list, replace (manager)
/// /schedule/time-off                               list, create (manager)
/// /schedule/time-off/{id}                          delete (manager)
/// /schedule/exceptions                             list, create (manager)
/// /schedule/exceptions/{id}                        delete (manager)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Staff PIN login.
        .nest("/auth", auth::router())
        // Online booking widget.
        .nest("/public", public::router())
        // Backoffice calendar.
        .nest("/appointments", appointments::router())
        .nest("/customers", customers::router())
        .nest("/staff", staff::router())
        .nest("/schedule", schedule::router())
}
