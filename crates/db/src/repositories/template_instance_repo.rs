//! Repository for `workflow_template_instances` joined with templates.

use conveyor_core::types::DbId;
use sqlx::PgPool;

use crate::models::template::TemplateInstance;

/// Read access to template instances.
pub struct TemplateInstanceRepo;

impl TemplateInstanceRepo {
    /// Load the instances that generated any of the given workflows.
    pub async fn list_by_workflow_ids(
        pool: &PgPool,
        workflow_ids: &[DbId],
    ) -> Result<Vec<TemplateInstance>, sqlx::Error> {
        sqlx::query_as::<_, TemplateInstance>(
            "SELECT wti.id, wti.workflow_template_id, wti.workflow_id, \
                wti.workflow_template_version, \
                wt.group_name AS template_group_name, wt.slug AS template_slug, \
                wt.version AS template_version, wti.created_at \
             FROM workflow_template_instances wti \
             JOIN workflow_templates wt ON wt.id = wti.workflow_template_id \
             WHERE wti.workflow_id = ANY($1) \
             ORDER BY wti.id",
        )
        .bind(workflow_ids)
        .fetch_all(pool)
        .await
    }
}
