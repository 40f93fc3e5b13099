//! Repository for the `pipelines` table.

use conveyor_core::types::DbId;
use sqlx::PgPool;

use crate::models::pipeline::Pipeline;

const COLUMNS: &str = "id, project_id, name, description, created_at, updated_at";

/// Read access to pipelines.
pub struct PipelineRepo;

impl PipelineRepo {
    /// Load every pipeline whose id is in `ids`, in one query.
    pub async fn list_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Pipeline>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pipelines WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Pipeline>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
