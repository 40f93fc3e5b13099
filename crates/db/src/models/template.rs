//! Workflow template instance model.

use conveyor_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A `workflow_template_instances` row joined with its template.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TemplateInstance {
    pub id: DbId,
    pub workflow_template_id: DbId,
    pub workflow_id: Option<DbId>,
    /// Template version the workflow was generated from.
    pub workflow_template_version: i64,
    pub template_group_name: String,
    pub template_slug: String,
    /// Current version of the template.
    pub template_version: i64,
    pub created_at: Timestamp,
}

impl TemplateInstance {
    /// `group/slug` path of the template.
    pub fn template_path(&self) -> String {
        format!("{}/{}", self.template_group_name, self.template_slug)
    }

    /// `group/slug@version` the workflow was generated from.
    pub fn from_template(&self) -> String {
        format!("{}@{}", self.template_path(), self.workflow_template_version)
    }

    /// Whether the workflow was generated from the latest template version.
    pub fn up_to_date(&self) -> bool {
        self.template_version == self.workflow_template_version
    }
}
