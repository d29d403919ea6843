//! Repository for the `appointments` table.

use salon_core::appointment_status::AppointmentStatus;
use salon_core::intervals::TimeRange;
use salon_core::payment::PaymentStatus;
use salon_core::types::DbId;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::appointment::{Appointment, NewAppointment, UpdateAppointment};

const COLUMNS: &str = "id, location_id, customer_id, status, payment_status, starts_at, ends_at, \
    notes, idempotency_key, metadata, created_at, updated_at";

pub struct AppointmentRepo;

impl AppointmentRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        input: &NewAppointment,
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "INSERT INTO appointments
                (location_id, customer_id, status, payment_status, starts_at, ends_at,
                 notes, idempotency_key, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(input.location_id)
            .bind(input.customer_id)
            .bind(input.status.as_str())
            .bind(input.payment_status.as_str())
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(&input.notes)
            .bind(&input.idempotency_key)
            .bind(&input.metadata)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1");
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Row-lock an appointment for the rest of the transaction.
    pub async fn lock(conn: &mut PgConnection, id: DbId) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn find_by_idempotency_key(
        pool: &PgPool,
        location_id: DbId,
        key: &str,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments WHERE location_id = $1 AND idempotency_key = $2"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(location_id)
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Appointments overlapping `range`, optionally only those involving a staff member.
    pub async fn list_in_range(
        pool: &PgPool,
        location_id: DbId,
        range: TimeRange,
        staff_id: Option<DbId>,
    ) -> Result<Vec<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments a
             WHERE a.location_id = $1 AND a.starts_at < $3 AND a.ends_at > $2
               AND ($4::bigint IS NULL OR EXISTS (
                    SELECT 1 FROM appointment_items i
                    WHERE i.appointment_id = a.id AND i.staff_id = $4))
             ORDER BY a.starts_at, a.id"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(location_id)
            .bind(range.start)
            .bind(range.end)
            .bind(staff_id)
            .fetch_all(pool)
            .await
    }

    /// Members of a repeat series, in series order.
    pub async fn list_series(pool: &PgPool, series_id: Uuid) -> Result<Vec<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments
             WHERE metadata -> 'series' ->> 'series_id' = $1
             ORDER BY (metadata -> 'series' ->> 'index')::int, id"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(series_id.to_string())
            .fetch_all(pool)
            .await
    }

    pub async fn update_details(
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateAppointment,
        metadata: &serde_json::Value,
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET
                customer_id = COALESCE($2, customer_id),
                notes = COALESCE($3, notes),
                metadata = $4,
                updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(input.customer_id)
            .bind(&input.notes)
            .bind(metadata)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: DbId,
        status: AppointmentStatus,
        metadata: &serde_json::Value,
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET status = $2, metadata = $3, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(metadata)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn set_payment_status(
        conn: &mut PgConnection,
        id: DbId,
        status: PaymentStatus,
        metadata: &serde_json::Value,
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET payment_status = $2, metadata = $3, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(metadata)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn set_metadata(
        conn: &mut PgConnection,
        id: DbId,
        metadata: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE appointments SET metadata = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(metadata)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Recompute `starts_at`/`ends_at` from the appointment's items.
    pub async fn refresh_bounds(conn: &mut PgConnection, id: DbId) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "UPDATE appointments a SET
                starts_at = b.starts_at,
                ends_at = b.ends_at,
                updated_at = now()
             FROM (
                SELECT min(starts_at) AS starts_at, max(ends_at) AS ends_at
                FROM appointment_items WHERE appointment_id = $1
             ) b
             WHERE a.id = $1 AND b.starts_at IS NOT NULL
             RETURNING {}",
            prefixed_columns("a")
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_one(&mut *conn)
            .await
    }
}

fn prefixed_columns(alias: &str) -> String {
    COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}
