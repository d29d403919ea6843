//! Repository for the `resources` table.

use salon_core::types::DbId;
use sqlx::PgPool;

use crate::models::service::Resource;

const COLUMNS: &str = "id, location_id, name, capacity, is_active, created_at";

pub struct ResourceRepo;

impl ResourceRepo {
    pub async fn create(
        pool: &PgPool,
        location_id: DbId,
        name: &str,
        capacity: i32,
    ) -> Result<Resource, sqlx::Error> {
        let query = format!(
            "INSERT INTO resources (location_id, name, capacity) VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Resource>(&query)
            .bind(location_id)
            .bind(name)
            .bind(capacity)
            .fetch_one(pool)
            .await
    }

    pub async fn list_active(pool: &PgPool, location_id: DbId) -> Result<Vec<Resource>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM resources WHERE location_id = $1 AND is_active ORDER BY id"
        );
        sqlx::query_as::<_, Resource>(&query)
            .bind(location_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Resource>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM resources WHERE id = $1");
        sqlx::query_as::<_, Resource>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
