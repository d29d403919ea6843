//! Repository for the `time_off` table.

use salon_core::intervals::TimeRange;
use salon_core::types::DbId;
use sqlx::PgPool;

use crate::models::schedule::{CreateTimeOff, TimeOffEntry};

const COLUMNS: &str = "id, location_id, staff_id, starts_at, ends_at, reason, created_at";

pub struct TimeOffRepo;

impl TimeOffRepo {
    pub async fn create(
        pool: &PgPool,
        location_id: DbId,
        input: &CreateTimeOff,
    ) -> Result<TimeOffEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO time_off (location_id, staff_id, starts_at, ends_at, reason)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TimeOffEntry>(&query)
            .bind(location_id)
            .bind(input.staff_id)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(&input.reason)
            .fetch_one(pool)
            .await
    }

    /// Entries overlapping `range`, oldest start first.
    pub async fn list_overlapping(
        pool: &PgPool,
        location_id: DbId,
        range: TimeRange,
    ) -> Result<Vec<TimeOffEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM time_off
             WHERE location_id = $1 AND starts_at < $3 AND ends_at > $2
             ORDER BY starts_at, id"
        );
        sqlx::query_as::<_, TimeOffEntry>(&query)
            .bind(location_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(pool)
            .await
    }

    /// Delete an entry of `location_id`. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, location_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM time_off WHERE id = $1 AND location_id = $2")
            .bind(id)
            .bind(location_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
