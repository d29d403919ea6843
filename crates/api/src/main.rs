use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salon_api::config::ServerConfig;
use salon_api::notifications::build_dispatcher;
use salon_api::router::build_app_router;
use salon_api::state::AppState;
use salon_db::repositories::MembershipRepo;
use salon_events::EventBus;
use salon_shiftplan::{HttpShiftPlanClient, ShiftPlanConfig, ShiftPlanProvider, StaticShiftPlan};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salon_api=debug,salon_events=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = salon_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    salon_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    salon_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let memberships = MembershipRepo::probe(&pool)
        .await
        .expect("Failed to probe membership tables");
    tracing::info!(
        staff = memberships.staff,
        customers = memberships.customers,
        "Membership support detected"
    );

    // --- Shift plan ---
    let shift_plan: Arc<dyn ShiftPlanProvider> = match ShiftPlanConfig::from_env() {
        Some(plan_config) => {
            tracing::info!(base_url = %plan_config.base_url, "Using external shift plan");
            Arc::new(HttpShiftPlanClient::new(plan_config).expect("Failed to build shift plan client"))
        }
        None => {
            tracing::info!("No shift plan configured, using weekly hours only");
            Arc::new(StaticShiftPlan::default())
        }
    };

    // --- Event bus and notifications ---
    let event_bus = Arc::new(EventBus::default());
    let dispatcher = build_dispatcher(pool.clone(), &config);
    let dispatcher_cancel = CancellationToken::new();
    let dispatcher_handle = tokio::spawn(dispatcher.run(event_bus.subscribe(), dispatcher_cancel.clone()));
    tracing::info!("Notification dispatcher started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        shift_plan,
        memberships,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining notifications");
    dispatcher_cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, dispatcher_handle).await.is_err() {
        tracing::warn!("Notification dispatcher did not stop in time");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
