//! Repository for the `workflows` table.

use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::workflow::{Workflow, WorkflowListQuery, WorkflowRow};
use crate::query::QueryArg;

/// Read and update access to workflows.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// List workflows matching the query's filters, ordering and page.
    pub async fn list(pool: &PgPool, query: &WorkflowListQuery) -> Result<Vec<WorkflowRow>, sqlx::Error> {
        let composed = query.compose();
        let mut q = sqlx::query_as::<_, WorkflowRow>(&composed.sql);
        for arg in &composed.args {
            q = match arg {
                QueryArg::Text(value) => q.bind(value.as_str()),
                QueryArg::Ids(ids) => q.bind(ids.as_slice()),
            };
        }
        q.fetch_all(pool).await
    }

    /// Find a workflow by project key and name.
    pub async fn find_by_name(
        pool: &PgPool,
        project_key: &str,
        name: &str,
    ) -> Result<Option<WorkflowRow>, sqlx::Error> {
        sqlx::query_as::<_, WorkflowRow>(
            "SELECT w.id, w.project_id, p.key AS project_key, w.name, w.description, w.icon, \
                w.from_repository, w.workflow_data, w.created_at, w.updated_at \
             FROM workflows w \
             JOIN projects p ON p.id = w.project_id \
             WHERE p.key = $1 AND w.name = $2",
        )
        .bind(project_key)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Persist the editable fields and the node tree of a workflow.
    ///
    /// Returns `true` if a row was updated.
    pub async fn update(pool: &PgPool, workflow: &Workflow) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflows SET \
                name = $2, description = $3, icon = $4, workflow_data = $5, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(workflow.id)
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(&workflow.icon)
        .bind(Json(&workflow.workflow_data))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
