//! Repository for the `appointment_items` table.
//!
//! "Blocked" ranges below are service time widened by the item's buffers.

use salon_core::intervals::TimeRange;
use salon_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::appointment::{AppointmentItem, NewAppointmentItem};

const COLUMNS: &str = "i.id, i.appointment_id, i.service_id, i.staff_id, i.resource_id, \
    i.starts_at, i.ends_at, i.buffer_before_minutes, i.buffer_after_minutes, i.created_at";

/// Blocked range of item `i` overlaps `[$start, $end)`; cancelled appointments excluded.
const BLOCKING_OVERLAP: &str = "a.status <> 'CANCELLED'
    AND i.starts_at - make_interval(mins => i.buffer_before_minutes) < $3
    AND i.ends_at + make_interval(mins => i.buffer_after_minutes) > $2";

pub struct AppointmentItemRepo;

impl AppointmentItemRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        appointment_id: DbId,
        item: &NewAppointmentItem,
    ) -> Result<AppointmentItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO appointment_items AS i
                (appointment_id, service_id, staff_id, resource_id, starts_at, ends_at,
                 buffer_before_minutes, buffer_after_minutes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AppointmentItem>(&query)
            .bind(appointment_id)
            .bind(item.service_id)
            .bind(item.staff_id)
            .bind(item.resource_id)
            .bind(item.starts_at)
            .bind(item.ends_at)
            .bind(item.buffer_before_minutes)
            .bind(item.buffer_after_minutes)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn list_for_appointment<'e>(
        executor: impl PgExecutor<'e>,
        appointment_id: DbId,
    ) -> Result<Vec<AppointmentItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointment_items i
             WHERE i.appointment_id = $1
             ORDER BY i.starts_at, i.id"
        );
        sqlx::query_as::<_, AppointmentItem>(&query)
            .bind(appointment_id)
            .fetch_all(executor)
            .await
    }

    pub async fn list_for_appointments(
        pool: &PgPool,
        appointment_ids: &[DbId],
    ) -> Result<Vec<AppointmentItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointment_items i
             WHERE i.appointment_id = ANY($1)
             ORDER BY i.appointment_id, i.starts_at, i.id"
        );
        sqlx::query_as::<_, AppointmentItem>(&query)
            .bind(appointment_ids)
            .fetch_all(pool)
            .await
    }

    /// Items that occupy calendar time around `range`: everything booked at
    /// the location plus whatever `staff_ids` have booked elsewhere.
    pub async fn busy_in_range(
        pool: &PgPool,
        location_id: DbId,
        range: TimeRange,
        staff_ids: &[DbId],
    ) -> Result<Vec<AppointmentItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointment_items i
             JOIN appointments a ON a.id = i.appointment_id
             WHERE (a.location_id = $1 OR i.staff_id = ANY($4))
               AND {BLOCKING_OVERLAP}
             ORDER BY i.starts_at, i.id"
        );
        sqlx::query_as::<_, AppointmentItem>(&query)
            .bind(location_id)
            .bind(range.start)
            .bind(range.end)
            .bind(staff_ids)
            .fetch_all(pool)
            .await
    }

    /// Live items of a staff member whose blocked range overlaps `range`.
    pub async fn overlapping_for_staff(
        conn: &mut PgConnection,
        staff_id: DbId,
        range: TimeRange,
        exclude_appointment: Option<DbId>,
    ) -> Result<Vec<AppointmentItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointment_items i
             JOIN appointments a ON a.id = i.appointment_id
             WHERE i.staff_id = $1
               AND ($4::bigint IS NULL OR a.id <> $4)
               AND {BLOCKING_OVERLAP}"
        );
        sqlx::query_as::<_, AppointmentItem>(&query)
            .bind(staff_id)
            .bind(range.start)
            .bind(range.end)
            .bind(exclude_appointment)
            .fetch_all(&mut *conn)
            .await
    }

    /// Live items using a resource whose blocked range overlaps `range`.
    pub async fn overlapping_for_resource(
        conn: &mut PgConnection,
        resource_id: DbId,
        range: TimeRange,
        exclude_appointment: Option<DbId>,
    ) -> Result<Vec<AppointmentItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointment_items i
             JOIN appointments a ON a.id = i.appointment_id
             WHERE i.resource_id = $1
               AND ($4::bigint IS NULL OR a.id <> $4)
               AND {BLOCKING_OVERLAP}"
        );
        sqlx::query_as::<_, AppointmentItem>(&query)
            .bind(resource_id)
            .bind(range.start)
            .bind(range.end)
            .bind(exclude_appointment)
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn update_range(
        conn: &mut PgConnection,
        id: DbId,
        starts_at: Timestamp,
        ends_at: Timestamp,
    ) -> Result<AppointmentItem, sqlx::Error> {
        let query = format!(
            "UPDATE appointment_items AS i SET starts_at = $2, ends_at = $3
             WHERE i.id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AppointmentItem>(&query)
            .bind(id)
            .bind(starts_at)
            .bind(ends_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Overwrite both buffers of an item.
    pub async fn set_buffers(
        conn: &mut PgConnection,
        id: DbId,
        buffer_before_minutes: i32,
        buffer_after_minutes: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE appointment_items
             SET buffer_before_minutes = $2, buffer_after_minutes = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(buffer_before_minutes)
        .bind(buffer_after_minutes)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM appointment_items WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_for_appointment(
        conn: &mut PgConnection,
        appointment_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM appointment_items WHERE appointment_id = $1")
            .bind(appointment_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
