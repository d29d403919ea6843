//! Repository for the `booking_slot_claims` table.
//!
//! A claim reserves a computed slot for a short time while its checkout
//! runs. Expired claims are purged lazily on the next claim attempt.

use salon_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::slot_claim::SlotClaim;

pub struct SlotClaimRepo;

impl SlotClaimRepo {
    /// Delete expired claims of a location. Returns the number removed.
    pub async fn purge_expired(
        pool: &PgPool,
        location_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM booking_slot_claims WHERE location_id = $1 AND expires_at <= $2")
                .bind(location_id)
                .bind(now)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Try to take the claim on `(location_id, slot_key)`.
    ///
    /// Succeeds when no live claim exists, or when the live claim belongs to
    /// the same `idempotency_key` (a client retry), in which case its expiry
    /// is extended.
    pub async fn try_claim(
        pool: &PgPool,
        location_id: DbId,
        slot_key: &str,
        idempotency_key: &str,
        now: Timestamp,
        expires_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let purged = Self::purge_expired(pool, location_id, now).await?;
        if purged > 0 {
            tracing::debug!(location_id, purged, "Purged expired slot claims");
        }

        let inserted: Option<DbId> = sqlx::query_scalar(
            "INSERT INTO booking_slot_claims (location_id, slot_key, idempotency_key, claimed_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT ON CONSTRAINT uq_booking_slot_claims_slot DO NOTHING
             RETURNING id",
        )
        .bind(location_id)
        .bind(slot_key)
        .bind(idempotency_key)
        .bind(now)
        .bind(expires_at)
        .fetch_optional(pool)
        .await?;
        if inserted.is_some() {
            return Ok(true);
        }

        let refreshed = sqlx::query(
            "UPDATE booking_slot_claims SET expires_at = $4
             WHERE location_id = $1 AND slot_key = $2 AND idempotency_key = $3",
        )
        .bind(location_id)
        .bind(slot_key)
        .bind(idempotency_key)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(refreshed.rows_affected() > 0)
    }

    /// Drop a claim held by `idempotency_key`. Returns `true` if one was held.
    pub async fn release(
        pool: &PgPool,
        location_id: DbId,
        slot_key: &str,
        idempotency_key: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM booking_slot_claims
             WHERE location_id = $1 AND slot_key = $2 AND idempotency_key = $3",
        )
        .bind(location_id)
        .bind(slot_key)
        .bind(idempotency_key)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find(
        pool: &PgPool,
        location_id: DbId,
        slot_key: &str,
    ) -> Result<Option<SlotClaim>, sqlx::Error> {
        sqlx::query_as::<_, SlotClaim>(
            "SELECT id, location_id, slot_key, idempotency_key, claimed_at, expires_at
             FROM booking_slot_claims
             WHERE location_id = $1 AND slot_key = $2",
        )
        .bind(location_id)
        .bind(slot_key)
        .fetch_optional(pool)
        .await
    }

    pub async fn count_live(
        pool: &PgPool,
        location_id: DbId,
        now: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM booking_slot_claims WHERE location_id = $1 AND expires_at > $2",
        )
        .bind(location_id)
        .bind(now)
        .fetch_one(pool)
        .await
    }
}
