//! Repository for the `staff` table.

use salon_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::staff::{CreateStaff, LocationStaff, Staff};

const COLUMNS: &str = "id, location_id, first_name, last_name, email, role, pin_hash, \
    metadata, is_active, created_at, updated_at";

pub struct StaffRepo;

impl StaffRepo {
    pub async fn create(
        pool: &PgPool,
        location_id: DbId,
        input: &CreateStaff,
    ) -> Result<Staff, sqlx::Error> {
        let query = format!(
            "INSERT INTO staff (location_id, first_name, last_name, email, role, metadata)
             VALUES ($1, $2, $3, $4, COALESCE($5, 'staff'), COALESCE($6, '{{}}'::jsonb))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Staff>(&query)
            .bind(location_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.role)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Staff>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM staff WHERE id = $1");
        sqlx::query_as::<_, Staff>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active staff working at a location, home or via membership.
    ///
    /// The role is the one held at that location.
    pub async fn list_for_location(
        pool: &PgPool,
        location_id: DbId,
        with_memberships: bool,
    ) -> Result<Vec<LocationStaff>, sqlx::Error> {
        let query = if with_memberships {
            "SELECT s.id, s.first_name, s.last_name,
                    CASE WHEN s.location_id = $1 THEN s.role ELSE m.role END AS role,
                    s.metadata, s.is_active
             FROM staff s
             LEFT JOIN staff_location_memberships m
                    ON m.staff_id = s.id AND m.location_id = $1
             WHERE s.is_active AND (s.location_id = $1 OR m.id IS NOT NULL)
             ORDER BY s.id"
        } else {
            "SELECT id, first_name, last_name, role, metadata, is_active
             FROM staff
             WHERE is_active AND location_id = $1
             ORDER BY id"
        };
        sqlx::query_as::<_, LocationStaff>(query)
            .bind(location_id)
            .fetch_all(pool)
            .await
    }

    /// Role `staff_id` holds at `location_id`, `None` if they do not work there.
    pub async fn role_at(
        pool: &PgPool,
        staff_id: DbId,
        location_id: DbId,
        with_memberships: bool,
    ) -> Result<Option<String>, sqlx::Error> {
        let query = if with_memberships {
            "SELECT CASE WHEN s.location_id = $2 THEN s.role ELSE m.role END
             FROM staff s
             LEFT JOIN staff_location_memberships m
                    ON m.staff_id = s.id AND m.location_id = $2
             WHERE s.id = $1 AND s.is_active AND (s.location_id = $2 OR m.id IS NOT NULL)"
        } else {
            "SELECT role FROM staff WHERE id = $1 AND is_active AND location_id = $2"
        };
        sqlx::query_scalar(query)
            .bind(staff_id)
            .bind(location_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_pin_hash(pool: &PgPool, id: DbId, pin_hash: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE staff SET pin_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(pin_hash)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lock staff rows for the rest of the transaction, in id order.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM staff WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(ids)
            .fetch_all(&mut *conn)
            .await
    }
}
