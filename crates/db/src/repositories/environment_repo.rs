//! Repository for the `environments` table.

use conveyor_core::types::DbId;
use sqlx::PgPool;

use crate::models::environment::Environment;

const COLUMNS: &str = "id, project_id, name, created_at, updated_at";

/// Read access to environments.
pub struct EnvironmentRepo;

impl EnvironmentRepo {
    /// Load every environment whose id is in `ids`, in one query.
    pub async fn list_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Environment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM environments WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Environment>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
