use std::sync::Arc;

use salon_db::repositories::MembershipSupport;
use salon_events::EventBus;
use salon_shiftplan::ShiftPlanProvider;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: salon_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Domain events for the notification dispatcher.
    pub event_bus: Arc<EventBus>,
    /// External shift plan, consulted when computing staff working time.
    pub shift_plan: Arc<dyn ShiftPlanProvider>,
    /// Membership tables found by the startup probe.
    pub memberships: MembershipSupport,
}
