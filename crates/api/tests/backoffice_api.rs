mod common;

use axum::http::StatusCode;
use common::{
    at, booking_date, build_test_app, delete, expect_json, get, patch_json, post_json, put_json,
    seed_location, seed_salon, seed_staff, TEST_PIN,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// PIN login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn pin_login_issues_token(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);

    let json = expect_json(
        post_json(
            app.clone(),
            "/api/v1/auth/pin",
            None,
            json!({ "location_id": salon.location.id, "staff_id": salon.stylist.id, "pin": TEST_PIN }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    let data = &json["data"];
    assert_eq!(data["token_type"], "Bearer");
    assert_eq!(data["expires_in"], 3600);
    assert_eq!(data["staff"]["role"], "staff");
    assert_eq!(data["staff"]["location_id"], salon.location.id);

    // The issued token works against the backoffice.
    let token = data["access_token"].as_str().unwrap();
    expect_json(get(app, "/api/v1/staff", Some(token)).await, StatusCode::OK).await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wrong_pin_is_unauthorized(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);

    let json = expect_json(
        post_json(
            app,
            "/api/v1/auth/pin",
            None,
            json!({ "location_id": salon.location.id, "staff_id": salon.stylist.id, "pin": "0000" }),
        )
        .await,
        StatusCode::UNAUTHORIZED,
    )
    .await;
    assert_eq!(json["error"], "Invalid staff or PIN");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn pin_login_at_foreign_location_is_forbidden(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let other = seed_location(&pool, "Studio Nord").await;
    let app = build_test_app(pool);

    expect_json(
        post_json(
            app,
            "/api/v1/auth/pin",
            None,
            json!({ "location_id": other.id, "staff_id": salon.stylist.id, "pin": TEST_PIN }),
        )
        .await,
        StatusCode::FORBIDDEN,
    )
    .await;
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn customer_crud_and_search(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);
    let token = salon.stylist_token();

    let created = expect_json(
        post_json(
            app.clone(),
            "/api/v1/customers",
            Some(&token),
            json!({
                "first_name": " Berta ",
                "last_name": "Beispiel",
                "email": "Berta@Example.org",
                "phone": "+49 (30) 555-0101",
            }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["first_name"], "Berta");
    assert_eq!(created["data"]["email"], "berta@example.org");
    assert_eq!(created["data"]["phone"], "+49305550101");

    let updated = expect_json(
        patch_json(
            app.clone(),
            &format!("/api/v1/customers/{id}"),
            Some(&token),
            json!({ "notes": "Prefers mornings" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["data"]["notes"], "Prefers mornings");
    assert_eq!(updated["data"]["email"], "berta@example.org");

    let found = expect_json(
        get(app.clone(), "/api/v1/customers?q=beisp", Some(&token)).await,
        StatusCode::OK,
    )
    .await;
    let ids: Vec<_> = found["data"].as_array().unwrap().iter().map(|c| c["id"].clone()).collect();
    assert_eq!(ids, vec![json!(id)]);

    let none = expect_json(
        get(app, "/api/v1/customers?q=nobody-matches", Some(&token)).await,
        StatusCode::OK,
    )
    .await;
    assert!(none["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn customer_validation(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);
    let token = salon.stylist_token();

    let json = expect_json(
        post_json(
            app.clone(),
            "/api/v1/customers",
            Some(&token),
            json!({ "first_name": "", "last_name": "X" }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let json = expect_json(
        post_json(
            app.clone(),
            "/api/v1/customers",
            Some(&token),
            json!({ "first_name": "Carl", "last_name": "X", "phone": "call me" }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert!(json["error"].as_str().unwrap().contains("phone"));

    expect_json(
        get(app, "/api/v1/customers/999999", Some(&token)).await,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn consent_history_keeps_latest_state(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);
    let token = salon.stylist_token();

    let customer = expect_json(
        post_json(
            app.clone(),
            "/api/v1/customers",
            Some(&token),
            json!({ "first_name": "Dora", "last_name": "D", "email": "dora@example.org" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let uri = format!("/api/v1/customers/{}/consents", customer["data"]["id"]);

    expect_json(
        post_json(
            app.clone(),
            &uri,
            Some(&token),
            json!({ "consent_type": "marketing_sms", "action": "GRANTED" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let json = expect_json(
        post_json(
            app.clone(),
            &uri,
            Some(&token),
            json!({ "consent_type": "marketing_sms", "action": "REVOKED", "source": "phone call" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(json["data"]["current"]["marketing_sms"], false);

    let json = expect_json(get(app, &uri, Some(&token)).await, StatusCode::OK).await;
    let history = json["data"]["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["source"], "backoffice");
    assert_eq!(history[1]["source"], "phone call");
}

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn manager_creates_staff_with_pin(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);

    let created = expect_json(
        post_json(
            app.clone(),
            "/api/v1/staff",
            Some(&salon.manager_token()),
            json!({ "first_name": "Ida", "last_name": "Neu", "pin": "2468" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["role"], "staff");
    assert!(created["data"].get("pin_hash").is_none());

    expect_json(
        post_json(
            app.clone(),
            "/api/v1/auth/pin",
            None,
            json!({ "location_id": salon.location.id, "staff_id": id, "pin": "2468" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let listed = expect_json(
        get(app, "/api/v1/staff", Some(&salon.stylist_token())).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 3);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn managers_cannot_mint_owners(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);

    expect_json(
        post_json(
            app.clone(),
            "/api/v1/staff",
            Some(&salon.manager_token()),
            json!({ "first_name": "Olga", "last_name": "O", "role": "owner" }),
        )
        .await,
        StatusCode::FORBIDDEN,
    )
    .await;
    expect_json(
        post_json(
            app,
            "/api/v1/staff",
            Some(&salon.manager_token()),
            json!({ "first_name": "Olga", "last_name": "O", "role": "admin" }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn pin_changes(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);

    // Own PIN.
    let response = put_json(
        app.clone(),
        &format!("/api/v1/staff/{}/pin", salon.stylist.id),
        Some(&salon.stylist_token()),
        json!({ "pin": "13579" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Somebody else's PIN.
    let response = put_json(
        app.clone(),
        &format!("/api/v1/staff/{}/pin", salon.manager.id),
        Some(&salon.stylist_token()),
        json!({ "pin": "13579" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Malformed PIN.
    let response = put_json(
        app.clone(),
        &format!("/api/v1/staff/{}/pin", salon.stylist.id),
        Some(&salon.manager_token()),
        json!({ "pin": "12ab" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    expect_json(
        post_json(
            app,
            "/api/v1/auth/pin",
            None,
            json!({ "location_id": salon.location.id, "staff_id": salon.stylist.id, "pin": "13579" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn membership_lets_staff_work_elsewhere(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let other = seed_location(&pool, "Studio Nord").await;
    let guest = seed_staff(&pool, other.id, "Gero", "staff").await;
    let app = build_test_app(pool);

    let json = expect_json(
        post_json(
            app.clone(),
            &format!("/api/v1/staff/{}/memberships", guest.id),
            Some(&salon.manager_token()),
            json!({ "role": "staff" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(json["data"]["location_id"], salon.location.id);

    expect_json(
        post_json(
            app.clone(),
            "/api/v1/auth/pin",
            None,
            json!({ "location_id": salon.location.id, "staff_id": guest.id, "pin": TEST_PIN }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    // Home staff need no membership.
    expect_json(
        post_json(
            app,
            &format!("/api/v1/staff/{}/memberships", salon.stylist.id),
            Some(&salon.manager_token()),
            json!({}),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn staff_hours_replace_and_list(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);
    let windows: Vec<_> = (0..7)
        .map(|weekday| json!({ "weekday": weekday, "open_minute": 720, "close_minute": 1020 }))
        .collect();

    let json = expect_json(
        post_json(
            app.clone(),
            "/api/v1/schedule/opening-hours",
            Some(&salon.manager_token()),
            json!({ "staff_id": salon.stylist.id, "windows": windows }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 7);

    let uri = format!("/api/v1/schedule/opening-hours?staff_id={}", salon.stylist.id);
    let json = expect_json(get(app.clone(), &uri, Some(&salon.stylist_token())).await, StatusCode::OK).await;
    assert!(json["data"].as_array().unwrap().iter().all(|h| h["open_minute"] == 720));

    // The stylist now starts at noon.
    let date = booking_date();
    let uri = format!(
        "/api/v1/public/locations/{}/availability?service_ids={}&from={date}&to={date}",
        salon.location.id, salon.service.id
    );
    let json = expect_json(get(app, &uri, None).await, StatusCode::OK).await;
    let first = &json["data"][0]["start"];
    assert_eq!(common::ts(first), at(12, 0));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn schedule_changes_need_a_manager(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/schedule/opening-hours",
        Some(&salon.stylist_token()),
        json!({ "windows": [] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn invalid_hours_are_rejected(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);

    expect_json(
        post_json(
            app,
            "/api/v1/schedule/opening-hours",
            Some(&salon.manager_token()),
            json!({ "windows": [{ "weekday": 1, "open_minute": 900, "close_minute": 600 }] }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[sqlx::test(migrations = "../db/migrations")]
async fn time_off_lifecycle(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);
    let token = salon.manager_token();

    expect_json(
        post_json(
            app.clone(),
            "/api/v1/schedule/time-off",
            Some(&token),
            json!({ "staff_id": salon.stylist.id, "starts_at": at(12, 0), "ends_at": at(9, 0) }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    let created = expect_json(
        post_json(
            app.clone(),
            "/api/v1/schedule/time-off",
            Some(&token),
            json!({
                "staff_id": salon.stylist.id,
                "starts_at": at(9, 0),
                "ends_at": at(12, 0),
                "reason": "Dentist",
            }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();

    let uri = format!(
        "/api/v1/schedule/time-off?from={}&to={}",
        at(0, 0).format("%Y-%m-%dT%H:%M:%SZ"),
        at(23, 0).format("%Y-%m-%dT%H:%M:%SZ"),
    );
    let listed = expect_json(get(app.clone(), &uri, Some(&token)).await, StatusCode::OK).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["reason"], "Dentist");

    let response = delete(app.clone(), &format!("/api/v1/schedule/time-off/{id}"), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = delete(app, &format!("/api/v1/schedule/time-off/{id}"), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn closed_day_has_no_slots(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);
    let token = salon.manager_token();
    let date = booking_date();

    let created = expect_json(
        post_json(
            app.clone(),
            "/api/v1/schedule/exceptions",
            Some(&token),
            json!({ "date": date, "kind": "closed", "note": "Inventory" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(created["data"]["kind"], "closed");
    let id = created["data"]["id"].as_i64().unwrap();

    let uri = format!(
        "/api/v1/public/locations/{}/availability?service_ids={}&from={date}&to={date}",
        salon.location.id, salon.service.id
    );
    let json = expect_json(get(app.clone(), &uri, None).await, StatusCode::OK).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let listed = expect_json(
        get(app.clone(), &format!("/api/v1/schedule/exceptions?from={date}&to={date}"), Some(&token)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let response = delete(app.clone(), &format!("/api/v1/schedule/exceptions/{id}"), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let json = expect_json(get(app, &uri, None).await, StatusCode::OK).await;
    assert!(!json["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn open_exception_needs_a_valid_window(pool: PgPool) {
    let salon = seed_salon(&pool).await;
    let app = build_test_app(pool);

    expect_json(
        post_json(
            app,
            "/api/v1/schedule/exceptions",
            Some(&salon.manager_token()),
            json!({ "date": booking_date(), "kind": "open", "open_minute": 800, "close_minute": 700 }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}
