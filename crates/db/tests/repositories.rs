//! Integration tests for the repository layer against a real database.

use chrono::{Duration, TimeZone, Utc};
use salon_core::intervals::TimeRange;
use salon_core::types::Timestamp;
use salon_db::models::appointment::{NewAppointment, NewAppointmentItem};
use salon_db::models::customer::CreateCustomer;
use salon_db::models::location::CreateLocation;
use salon_db::models::service::CreateService;
use salon_db::models::staff::CreateStaff;
use salon_db::repositories::{
    AppointmentItemRepo, AppointmentRepo, CustomerRepo, LocationRepo, MembershipRepo,
    ServiceRepo, SlotClaimRepo, StaffRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(h: u32, m: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

async fn location(pool: &PgPool, name: &str) -> i64 {
    LocationRepo::create(
        pool,
        &CreateLocation {
            name: name.to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .id
}

async fn staff(pool: &PgPool, location_id: i64, first_name: &str) -> i64 {
    StaffRepo::create(
        pool,
        location_id,
        &CreateStaff {
            first_name: first_name.to_string(),
            last_name: "Test".to_string(),
            email: None,
            role: None,
            metadata: None,
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_health_and_membership_probe(pool: PgPool) {
    salon_db::health_check(&pool).await.unwrap();

    let support = MembershipRepo::probe(&pool).await.unwrap();
    assert!(support.staff);
    assert!(support.customers);
    assert!(!MembershipRepo::table_exists(&pool, "no_such_table").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_slot_claim_lifecycle(pool: PgPool) {
    let loc = location(&pool, "Claims").await;
    let now = at(9, 0);
    let expires = now + Duration::seconds(120);

    assert!(SlotClaimRepo::try_claim(&pool, loc, "k1", "client-a", now, expires).await.unwrap());
    // Another client loses while the claim is live.
    assert!(!SlotClaimRepo::try_claim(&pool, loc, "k1", "client-b", now, expires).await.unwrap());
    // The same client may retry.
    assert!(SlotClaimRepo::try_claim(&pool, loc, "k1", "client-a", now, expires).await.unwrap());

    // Once expired, the next attempt purges it and wins.
    let later = now + Duration::seconds(121);
    assert!(
        SlotClaimRepo::try_claim(&pool, loc, "k1", "client-b", later, later + Duration::seconds(120))
            .await
            .unwrap()
    );
    let claim = SlotClaimRepo::find(&pool, loc, "k1").await.unwrap().unwrap();
    assert_eq!(claim.idempotency_key, "client-b");

    assert!(SlotClaimRepo::release(&pool, loc, "k1", "client-b").await.unwrap());
    assert_eq!(SlotClaimRepo::count_live(&pool, loc, later).await.unwrap(), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_customer_lookup_respects_memberships(pool: PgPool) {
    let home = location(&pool, "Home").await;
    let other = location(&pool, "Other").await;

    let mut conn = pool.acquire().await.unwrap();
    let customer = CustomerRepo::create(
        &mut conn,
        home,
        &CreateCustomer {
            first_name: "Anna".into(),
            last_name: "Muster".into(),
            email: Some("anna@example.com".into()),
            phone: Some("+491701234567".into()),
            notes: None,
            metadata: None,
        },
    )
    .await
    .unwrap();

    let found = CustomerRepo::find_by_email(&pool, home, "ANNA@example.com", true)
        .await
        .unwrap();
    assert_eq!(found.map(|c| c.id), Some(customer.id));
    assert!(CustomerRepo::find_by_phone(&pool, other, "+491701234567", true)
        .await
        .unwrap()
        .is_none());

    MembershipRepo::ensure_customer(&mut conn, customer.id, other).await.unwrap();
    let found = CustomerRepo::find_by_phone(&pool, other, "+491701234567", true)
        .await
        .unwrap();
    assert_eq!(found.map(|c| c.id), Some(customer.id));
    // Without membership support only the home location sees the customer.
    assert!(CustomerRepo::find_by_phone(&pool, other, "+491701234567", false)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_staff_listing_includes_members(pool: PgPool) {
    let home = location(&pool, "Home").await;
    let other = location(&pool, "Other").await;
    let anna = staff(&pool, home, "Anna").await;
    let ben = staff(&pool, other, "Ben").await;

    MembershipRepo::upsert_staff(&pool, anna, other, "manager").await.unwrap();

    let at_other = StaffRepo::list_for_location(&pool, other, true).await.unwrap();
    let ids: Vec<i64> = at_other.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![anna, ben]);
    assert_eq!(at_other[0].role, "manager");

    assert_eq!(
        StaffRepo::role_at(&pool, anna, other, true).await.unwrap().as_deref(),
        Some("manager")
    );
    assert!(StaffRepo::role_at(&pool, anna, other, false).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_busy_items_include_buffers_and_skip_cancelled(pool: PgPool) {
    let loc = location(&pool, "Busy").await;
    let anna = staff(&pool, loc, "Anna").await;
    let service = ServiceRepo::create(
        &pool,
        loc,
        &CreateService {
            name: "Cut".into(),
            description: None,
            price_cents: Some(3500),
            steps: serde_json::from_value(serde_json::json!([{ "duration_minutes": 30 }])).unwrap(),
            bookable_online: None,
        },
    )
    .await
    .unwrap();

    let mut tx = pool.begin().await.unwrap();
    let appointment = AppointmentRepo::insert(
        &mut tx,
        &NewAppointment {
            location_id: loc,
            customer_id: None,
            status: salon_core::appointment_status::AppointmentStatus::Confirmed,
            payment_status: salon_core::payment::PaymentStatus::Unpaid,
            starts_at: at(10, 0),
            ends_at: at(10, 30),
            notes: None,
            idempotency_key: None,
            metadata: serde_json::json!({}),
        },
    )
    .await
    .unwrap();
    AppointmentItemRepo::insert(
        &mut tx,
        appointment.id,
        &NewAppointmentItem {
            service_id: service.id,
            staff_id: Some(anna),
            resource_id: None,
            starts_at: at(10, 0),
            ends_at: at(10, 30),
            buffer_before_minutes: 0,
            buffer_after_minutes: 15,
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    // 10:30-10:40 only touches the trailing buffer.
    let probe = TimeRange::new(at(10, 30), at(10, 40)).unwrap();
    let busy = AppointmentItemRepo::busy_in_range(&pool, loc, probe, &[anna]).await.unwrap();
    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].blocked().unwrap().end, at(10, 45));

    let mut conn = pool.acquire().await.unwrap();
    let overlapping =
        AppointmentItemRepo::overlapping_for_staff(&mut conn, anna, probe, Some(appointment.id))
            .await
            .unwrap();
    assert!(overlapping.is_empty());

    sqlx::query("UPDATE appointments SET status = 'CANCELLED' WHERE id = $1")
        .bind(appointment.id)
        .execute(&pool)
        .await
        .unwrap();
    let busy = AppointmentItemRepo::busy_in_range(&pool, loc, probe, &[anna]).await.unwrap();
    assert!(busy.is_empty());
}
