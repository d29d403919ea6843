//! Repository for the `weekly_hours` table.

use salon_core::types::DbId;
use sqlx::PgPool;

use crate::models::schedule::{WeeklyHours, WeeklyWindow};

const COLUMNS: &str = "id, location_id, staff_id, weekday, open_minute, close_minute, created_at";

pub struct WeeklyHoursRepo;

impl WeeklyHoursRepo {
    /// Location hours and every staff rule at a location.
    pub async fn list_for_location(
        pool: &PgPool,
        location_id: DbId,
    ) -> Result<Vec<WeeklyHours>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM weekly_hours
             WHERE location_id = $1
             ORDER BY staff_id NULLS FIRST, weekday, open_minute"
        );
        sqlx::query_as::<_, WeeklyHours>(&query)
            .bind(location_id)
            .fetch_all(pool)
            .await
    }

    /// Replace the rules for one owner (`staff_id = None` for the location).
    pub async fn replace(
        pool: &PgPool,
        location_id: DbId,
        staff_id: Option<DbId>,
        windows: &[WeeklyWindow],
    ) -> Result<Vec<WeeklyHours>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "DELETE FROM weekly_hours
             WHERE location_id = $1 AND staff_id IS NOT DISTINCT FROM $2",
        )
        .bind(location_id)
        .bind(staff_id)
        .execute(&mut *tx)
        .await?;

        let insert = format!(
            "INSERT INTO weekly_hours (location_id, staff_id, weekday, open_minute, close_minute)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let mut rows = Vec::with_capacity(windows.len());
        for window in windows {
            let row = sqlx::query_as::<_, WeeklyHours>(&insert)
                .bind(location_id)
                .bind(staff_id)
                .bind(i16::from(window.weekday))
                .bind(i32::from(window.open_minute))
                .bind(i32::from(window.close_minute))
                .fetch_one(&mut *tx)
                .await?;
            rows.push(row);
        }

        tx.commit().await?;
        Ok(rows)
    }
}
