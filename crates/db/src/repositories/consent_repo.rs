//! Repository for the append-only `consent_records` table.

use salon_core::consent::{ConsentAction, ConsentType};
use salon_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::customer::ConsentRecord;

const COLUMNS: &str = "id, customer_id, consent_type, action, source, recorded_at";

pub struct ConsentRepo;

impl ConsentRepo {
    pub async fn record(
        conn: &mut PgConnection,
        customer_id: DbId,
        consent_type: ConsentType,
        action: ConsentAction,
        source: &str,
    ) -> Result<ConsentRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO consent_records (customer_id, consent_type, action, source)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConsentRecord>(&query)
            .bind(customer_id)
            .bind(consent_type.as_str())
            .bind(action.as_str())
            .bind(source)
            .fetch_one(&mut *conn)
            .await
    }

    /// Full history, oldest first.
    pub async fn list_for_customer(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Vec<ConsentRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM consent_records
             WHERE customer_id = $1
             ORDER BY recorded_at, id"
        );
        sqlx::query_as::<_, ConsentRecord>(&query)
            .bind(customer_id)
            .fetch_all(pool)
            .await
    }
}
