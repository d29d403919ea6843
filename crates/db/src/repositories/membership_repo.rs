//! Multi-location memberships for staff and customers.
//!
//! Older databases only know `staff.location_id` / `customers.location_id`.
//! Whether the membership tables exist is probed once at startup and
//! carried around as [`MembershipSupport`].

use salon_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::staff::StaffMembership;

/// Which membership tables the connected database has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MembershipSupport {
    pub staff: bool,
    pub customers: bool,
}

pub struct MembershipRepo;

impl MembershipRepo {
    /// Check `information_schema` for a table in the current schema.
    pub async fn table_exists(pool: &PgPool, table: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
             )",
        )
        .bind(table)
        .fetch_one(pool)
        .await
    }

    pub async fn probe(pool: &PgPool) -> Result<MembershipSupport, sqlx::Error> {
        Ok(MembershipSupport {
            staff: Self::table_exists(pool, "staff_location_memberships").await?,
            customers: Self::table_exists(pool, "customer_location_memberships").await?,
        })
    }

    /// Add (or re-role) a staff member at another location.
    pub async fn upsert_staff(
        pool: &PgPool,
        staff_id: DbId,
        location_id: DbId,
        role: &str,
    ) -> Result<StaffMembership, sqlx::Error> {
        sqlx::query_as::<_, StaffMembership>(
            "INSERT INTO staff_location_memberships (staff_id, location_id, role)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_staff_location_memberships
             DO UPDATE SET role = EXCLUDED.role
             RETURNING id, staff_id, location_id, role, created_at",
        )
        .bind(staff_id)
        .bind(location_id)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// Make sure a customer is visible at `location_id`.
    pub async fn ensure_customer(
        conn: &mut PgConnection,
        customer_id: DbId,
        location_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO customer_location_memberships (customer_id, location_id)
             VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT uq_customer_location_memberships DO NOTHING",
        )
        .bind(customer_id)
        .bind(location_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
