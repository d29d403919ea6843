#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use salon_api::auth::jwt::{generate_access_token, JwtConfig};
use salon_api::auth::pin::hash_pin;
use salon_api::config::ServerConfig;
use salon_api::router::build_app_router;
use salon_api::state::AppState;
use salon_core::availability::ServiceStep;
use salon_core::types::{DbId, Timestamp};
use salon_db::models::location::{CreateLocation, Location};
use salon_db::models::schedule::WeeklyWindow;
use salon_db::models::service::{CreateService, Service};
use salon_db::models::staff::{CreateStaff, Staff};
use salon_db::repositories::{
    LocationRepo, MembershipSupport, ServiceRepo, StaffRepo, WeeklyHoursRepo,
};
use salon_events::EventBus;
use salon_shiftplan::StaticShiftPlan;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_PIN: &str = "4711";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        slot_claim_ttl_secs: 120,
        mail_breaker_threshold: 5,
        mail_breaker_cooldown_secs: 60,
        jwt: JwtConfig {
            secret: "test-secret-not-for-production".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

pub fn test_state(pool: PgPool) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
        event_bus: Arc::new(EventBus::default()),
        shift_plan: Arc::new(StaticShiftPlan::default()),
        memberships: MembershipSupport {
            staff: true,
            customers: true,
        },
    }
}

/// The production router over a test pool.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_router(test_state(pool), &test_config())
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> axum::response::Response {
    app.oneshot(request).await.unwrap()
}

fn builder(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> axum::response::Response {
    send(app, builder("GET", uri, token).body(Body::empty()).unwrap()).await
}

pub async fn delete(app: Router, uri: &str, token: Option<&str>) -> axum::response::Response {
    send(app, builder("DELETE", uri, token).body(Body::empty()).unwrap()).await
}

async fn with_json(
    method: &str,
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> axum::response::Response {
    let request = builder(method, uri, token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, token: Option<&str>, body: Value) -> axum::response::Response {
    with_json("POST", app, uri, token, body).await
}

pub async fn put_json(app: Router, uri: &str, token: Option<&str>, body: Value) -> axum::response::Response {
    with_json("PUT", app, uri, token, body).await
}

pub async fn patch_json(app: Router, uri: &str, token: Option<&str>, body: Value) -> axum::response::Response {
    with_json("PATCH", app, uri, token, body).await
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the parsed body.
pub async fn expect_json(response: axum::response::Response, status: StatusCode) -> Value {
    let actual = response.status();
    let body = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {body}");
    body
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// A location open 09:00-17:00 UTC every day, 15 minute grid.
pub async fn seed_location(pool: &PgPool, name: &str) -> Location {
    let location = LocationRepo::create(
        pool,
        &CreateLocation {
            name: name.to_string(),
            phone: Some("+4930123456".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let windows: Vec<WeeklyWindow> = (0..7)
        .map(|weekday| WeeklyWindow {
            weekday,
            open_minute: 9 * 60,
            close_minute: 17 * 60,
        })
        .collect();
    WeeklyHoursRepo::replace(pool, location.id, None, &windows)
        .await
        .unwrap();
    location
}

/// Active staff member with [`TEST_PIN`].
pub async fn seed_staff(pool: &PgPool, location_id: DbId, first_name: &str, role: &str) -> Staff {
    let staff = StaffRepo::create(
        pool,
        location_id,
        &CreateStaff {
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            email: None,
            role: Some(role.to_string()),
            metadata: None,
        },
    )
    .await
    .unwrap();
    StaffRepo::set_pin_hash(pool, staff.id, &hash_pin(TEST_PIN).unwrap())
        .await
        .unwrap();
    staff
}

/// Single staffed step of `minutes`.
pub async fn seed_service(pool: &PgPool, location_id: DbId, name: &str, minutes: u32) -> Service {
    ServiceRepo::create(
        pool,
        location_id,
        &CreateService {
            name: name.to_string(),
            description: None,
            price_cents: Some(4500),
            steps: vec![ServiceStep {
                duration_minutes: minutes,
                buffer_before_minutes: 0,
                buffer_after_minutes: 0,
                needs_staff: true,
                eligible_staff: vec![],
                resource_ids: vec![],
            }],
            bookable_online: Some(true),
        },
    )
    .await
    .unwrap()
}

pub fn token_for(staff: &Staff, location_id: DbId) -> String {
    generate_access_token(staff.id, location_id, &staff.role, &test_config().jwt).unwrap()
}

/// A date far enough ahead that lead time never interferes.
pub fn booking_date() -> NaiveDate {
    (Utc::now() + Duration::days(3)).date_naive()
}

/// `hour:minute` UTC on [`booking_date`].
pub fn at(hour: u32, minute: u32) -> Timestamp {
    let date = booking_date();
    Utc.from_utc_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
}

/// Everything a booking test needs: a location with one stylist and one
/// 60 minute service.
pub struct Salon {
    pub location: Location,
    pub manager: Staff,
    pub stylist: Staff,
    pub service: Service,
}

impl Salon {
    pub fn manager_token(&self) -> String {
        token_for(&self.manager, self.location.id)
    }

    pub fn stylist_token(&self) -> String {
        token_for(&self.stylist, self.location.id)
    }
}

pub async fn seed_salon(pool: &PgPool) -> Salon {
    let location = seed_location(pool, "Studio Mitte").await;
    let manager = seed_staff(pool, location.id, "Mara", "manager").await;
    let stylist = seed_staff(pool, location.id, "Sven", "staff").await;
    let service = seed_service(pool, location.id, "Haircut", 60).await;
    // Only the stylist cuts hair.
    ServiceRepo::set_qualified_staff(pool, service.id, &[stylist.id])
        .await
        .unwrap();
    Salon {
        location,
        manager,
        stylist,
        service,
    }
}

/// Parse a JSON timestamp.
pub fn ts(value: &Value) -> Timestamp {
    serde_json::from_value(value.clone()).unwrap()
}
