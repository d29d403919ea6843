//! Repository for the `availability_exceptions` table.

use chrono::NaiveDate;
use salon_core::availability::ExceptionKind;
use salon_core::types::DbId;
use sqlx::PgPool;

use crate::models::schedule::{CreateException, ExceptionEntry};

const COLUMNS: &str =
    "id, location_id, staff_id, exception_date, kind, open_minute, close_minute, note, created_at";

pub struct ExceptionRepo;

impl ExceptionRepo {
    pub async fn create(
        pool: &PgPool,
        location_id: DbId,
        input: &CreateException,
    ) -> Result<ExceptionEntry, sqlx::Error> {
        let (kind, open, close) = match input.kind {
            ExceptionKind::Closed => ("closed", None, None),
            ExceptionKind::Open {
                open_minute,
                close_minute,
            } => ("open", Some(i32::from(open_minute)), Some(i32::from(close_minute))),
        };
        let query = format!(
            "INSERT INTO availability_exceptions
                (location_id, staff_id, exception_date, kind, open_minute, close_minute, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExceptionEntry>(&query)
            .bind(location_id)
            .bind(input.staff_id)
            .bind(input.date)
            .bind(kind)
            .bind(open)
            .bind(close)
            .bind(&input.note)
            .fetch_one(pool)
            .await
    }

    /// Exceptions dated within `[from, to]`.
    pub async fn list_between(
        pool: &PgPool,
        location_id: DbId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExceptionEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM availability_exceptions
             WHERE location_id = $1 AND exception_date BETWEEN $2 AND $3
             ORDER BY exception_date, id"
        );
        sqlx::query_as::<_, ExceptionEntry>(&query)
            .bind(location_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, location_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM availability_exceptions WHERE id = $1 AND location_id = $2")
                .bind(id)
                .bind(location_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
