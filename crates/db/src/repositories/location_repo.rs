//! Repository for the `locations` table.

use salon_core::types::DbId;
use sqlx::PgPool;

use crate::models::location::{CreateLocation, Location};

const COLUMNS: &str = "id, name, email, phone, utc_offset_minutes, granularity_minutes, \
    smart_slots, lead_time_minutes, horizon_days, max_slots, requires_confirmation, \
    notify_email, notify_sms, notify_whatsapp, created_at, updated_at";

pub struct LocationRepo;

impl LocationRepo {
    /// Insert a location. Settings left `None` take the column defaults.
    pub async fn create(pool: &PgPool, input: &CreateLocation) -> Result<Location, sqlx::Error> {
        let query = format!(
            "INSERT INTO locations
                (name, email, phone, utc_offset_minutes, granularity_minutes, smart_slots,
                 lead_time_minutes, horizon_days, requires_confirmation)
             VALUES ($1, $2, $3, COALESCE($4, 0), COALESCE($5, 15), COALESCE($6, false),
                     COALESCE($7, 0), COALESCE($8, 90), COALESCE($9, false))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Location>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(input.utc_offset_minutes)
            .bind(input.granularity_minutes)
            .bind(input.smart_slots)
            .bind(input.lead_time_minutes)
            .bind(input.horizon_days)
            .bind(input.requires_confirmation)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Location>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM locations WHERE id = $1");
        sqlx::query_as::<_, Location>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Toggle the notification channels of a location.
    pub async fn set_notification_channels(
        pool: &PgPool,
        id: DbId,
        email: bool,
        sms: bool,
        whatsapp: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE locations
             SET notify_email = $2, notify_sms = $3, notify_whatsapp = $4, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(email)
        .bind(sms)
        .bind(whatsapp)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
