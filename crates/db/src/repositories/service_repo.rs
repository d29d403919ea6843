//! Repository for the `services` and `service_staff` tables.

use salon_core::types::DbId;
use sqlx::PgPool;

use crate::models::service::{CreateService, Service};

const COLUMNS: &str = "id, location_id, name, description, price_cents, steps, \
    bookable_online, is_active, created_at, updated_at";

pub struct ServiceRepo;

impl ServiceRepo {
    pub async fn create(
        pool: &PgPool,
        location_id: DbId,
        input: &CreateService,
    ) -> Result<Service, sqlx::Error> {
        let steps = serde_json::to_value(&input.steps)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let query = format!(
            "INSERT INTO services (location_id, name, description, price_cents, steps, bookable_online)
             VALUES ($1, $2, $3, COALESCE($4, 0), $5, COALESCE($6, true))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Service>(&query)
            .bind(location_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price_cents)
            .bind(steps)
            .bind(input.bookable_online)
            .fetch_one(pool)
            .await
    }

    pub async fn list_active(pool: &PgPool, location_id: DbId) -> Result<Vec<Service>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM services WHERE location_id = $1 AND is_active ORDER BY name"
        );
        sqlx::query_as::<_, Service>(&query)
            .bind(location_id)
            .fetch_all(pool)
            .await
    }

    /// Qualified staff per service, as `(service_id, staff_id)` pairs.
    pub async fn qualified_staff(
        pool: &PgPool,
        service_ids: &[DbId],
    ) -> Result<Vec<(DbId, DbId)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT service_id, staff_id FROM service_staff
             WHERE service_id = ANY($1)
             ORDER BY service_id, staff_id",
        )
        .bind(service_ids)
        .fetch_all(pool)
        .await
    }

    /// Replace the qualified staff of a service.
    pub async fn set_qualified_staff(
        pool: &PgPool,
        service_id: DbId,
        staff_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM service_staff WHERE service_id = $1")
            .bind(service_id)
            .execute(&mut *tx)
            .await?;
        for &staff_id in staff_ids {
            sqlx::query("INSERT INTO service_staff (service_id, staff_id) VALUES ($1, $2)")
                .bind(service_id)
                .bind(staff_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }
}
