//! Repository for the `customers` table.
//!
//! A customer is visible at their home location and, when the database
//! has `customer_location_memberships`, at every location they joined.

use salon_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::customer::{CreateCustomer, Customer, UpdateCustomer};

const COLUMNS: &str = "c.id, c.location_id, c.first_name, c.last_name, c.email, c.phone, \
    c.notes, c.metadata, c.created_at, c.updated_at";

/// Default page size for customer search.
pub const DEFAULT_SEARCH_LIMIT: i64 = 50;

pub struct CustomerRepo;

impl CustomerRepo {
    /// SQL predicate restricting `c` to customers visible at location `$1`.
    fn visible_at(with_memberships: bool) -> &'static str {
        if with_memberships {
            "(c.location_id = $1 OR EXISTS (
                SELECT 1 FROM customer_location_memberships m
                WHERE m.customer_id = c.id AND m.location_id = $1))"
        } else {
            "c.location_id = $1"
        }
    }

    pub async fn create(
        conn: &mut PgConnection,
        location_id: DbId,
        input: &CreateCustomer,
    ) -> Result<Customer, sqlx::Error> {
        let query = format!(
            "INSERT INTO customers AS c (location_id, first_name, last_name, email, phone, notes, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, '{{}}'::jsonb))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(location_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.notes)
            .bind(&input.metadata)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Customer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customers c WHERE c.id = $1");
        sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a customer visible at `location_id` by id.
    pub async fn find_at_location(
        pool: &PgPool,
        location_id: DbId,
        id: DbId,
        with_memberships: bool,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customers c WHERE {} AND c.id = $2",
            Self::visible_at(with_memberships)
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(location_id)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive email match. Oldest record wins on duplicates.
    pub async fn find_by_email(
        pool: &PgPool,
        location_id: DbId,
        email: &str,
        with_memberships: bool,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customers c
             WHERE {} AND lower(c.email) = lower($2)
             ORDER BY c.id LIMIT 1",
            Self::visible_at(with_memberships)
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(location_id)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Exact match on the normalized phone number.
    pub async fn find_by_phone(
        pool: &PgPool,
        location_id: DbId,
        phone: &str,
        with_memberships: bool,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customers c
             WHERE {} AND c.phone = $2
             ORDER BY c.id LIMIT 1",
            Self::visible_at(with_memberships)
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(location_id)
            .bind(phone)
            .fetch_optional(pool)
            .await
    }

    /// Email or phone match across all locations, for membership linking.
    pub async fn find_anywhere(
        pool: &PgPool,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customers c
             WHERE ($1::text IS NOT NULL AND lower(c.email) = lower($1))
                OR ($2::text IS NOT NULL AND c.phone = $2)
             ORDER BY c.id LIMIT 1"
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(email)
            .bind(phone)
            .fetch_optional(pool)
            .await
    }

    /// Substring search over name, email and phone. Empty `q` lists all.
    pub async fn search(
        pool: &PgPool,
        location_id: DbId,
        q: &str,
        limit: i64,
        with_memberships: bool,
    ) -> Result<Vec<Customer>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customers c
             WHERE {} AND (
                $2 = ''
                OR (c.first_name || ' ' || c.last_name) ILIKE '%' || $2 || '%'
                OR c.email ILIKE '%' || $2 || '%'
                OR c.phone LIKE '%' || $2 || '%'
             )
             ORDER BY c.last_name, c.first_name, c.id
             LIMIT $3",
            Self::visible_at(with_memberships)
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(location_id)
            .bind(q)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Update a customer. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCustomer,
    ) -> Result<Option<Customer>, sqlx::Error> {
        let query = format!(
            "UPDATE customers AS c SET
                first_name = COALESCE($2, c.first_name),
                last_name = COALESCE($3, c.last_name),
                email = COALESCE($4, c.email),
                phone = COALESCE($5, c.phone),
                notes = COALESCE($6, c.notes),
                metadata = COALESCE($7, c.metadata),
                updated_at = now()
             WHERE c.id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Customer>(&query)
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.notes)
            .bind(&input.metadata)
            .fetch_optional(pool)
            .await
    }
}
