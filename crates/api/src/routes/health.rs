//! Liveness probe for load balancers and the kiosk clients.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when Postgres is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Whether the notification dispatcher is subscribed to booking events.
    pub notifications: bool,
    pub multi_location_staff: bool,
    pub multi_location_customers: bool,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = salon_db::health_check(&state.pool).await.is_ok();
    if !db_healthy {
        tracing::warn!("Health probe could not reach the database");
    }
    Json(HealthResponse {
        status: match db_healthy {
            true => "ok",
            false => "degraded",
        },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        notifications: state.event_bus.subscriber_count() > 0,
        multi_location_staff: state.memberships.staff,
        multi_location_customers: state.memberships.customers,
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
