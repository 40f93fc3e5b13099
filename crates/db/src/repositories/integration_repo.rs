//! Repository for the `project_integrations` table.

use conveyor_core::types::DbId;
use sqlx::PgPool;

use crate::models::integration::ProjectIntegration;

const COLUMNS: &str = "id, project_id, name, model, config, created_at, updated_at";

/// Read access to project integrations.
pub struct IntegrationRepo;

impl IntegrationRepo {
    /// Load every integration whose id is in `ids`, in one query.
    pub async fn list_by_ids(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<ProjectIntegration>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM project_integrations WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, ProjectIntegration>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
