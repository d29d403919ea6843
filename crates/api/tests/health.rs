mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get};
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn health_reports_database(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(app, "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
    assert!(json["version"].is_string());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn health_sets_request_id(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(app, "/health", None).await;

    assert!(response.headers().contains_key("x-request-id"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn health_reports_deployment_features(pool: PgPool) {
    let app = build_test_app(pool);
    let json = body_json(get(app, "/health", None).await).await;

    // No dispatcher runs in tests; the test state enables both membership tables.
    assert_eq!(json["notifications"], false);
    assert_eq!(json["multi_location_staff"], true);
    assert_eq!(json["multi_location_customers"], true);
}
