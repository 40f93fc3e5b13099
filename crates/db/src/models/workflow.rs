//! Workflow model, listing filters, and the in-memory aggregate.

use std::collections::BTreeMap;

use conveyor_core::types::{DbId, Timestamp};
use conveyor_core::workflow::WorkflowData;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::application::Application;
use crate::models::ascode_event::AsCodeEvent;
use crate::models::environment::Environment;
use crate::models::integration::ProjectIntegration;
use crate::models::pipeline::Pipeline;
use crate::models::template::TemplateInstance;

/// A `workflows` row joined with its project key.
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowRow {
    pub id: DbId,
    pub project_id: DbId,
    pub project_key: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub from_repository: String,
    pub workflow_data: Json<WorkflowData>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A workflow with its node tree and lazily resolved references.
///
/// The per-kind maps stay empty until a loader pass fills them; each pass
/// owns exactly one of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
    pub id: DbId,
    pub project_id: DbId,
    pub project_key: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    /// Empty when the workflow is not as code.
    pub from_repository: String,
    pub workflow_data: WorkflowData,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_instance: Option<TemplateInstance>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub from_template: String,
    pub template_up_to_date: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub as_code_events: Vec<AsCodeEvent>,

    pub applications: BTreeMap<DbId, Application>,
    pub environments: BTreeMap<DbId, Environment>,
    pub pipelines: BTreeMap<DbId, Pipeline>,
    pub project_integrations: BTreeMap<DbId, ProjectIntegration>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Workflow {
    /// Whether the workflow was generated by a template. Only meaningful
    /// after the template pass ran.
    pub fn is_from_template(&self) -> bool {
        self.template_instance.is_some()
    }
}

impl From<WorkflowRow> for Workflow {
    fn from(row: WorkflowRow) -> Self {
        Self {
            id: row.id,
            project_id: row.project_id,
            project_key: row.project_key,
            name: row.name,
            description: row.description,
            icon: row.icon,
            from_repository: row.from_repository,
            workflow_data: row.workflow_data.0,
            template_instance: None,
            from_template: String::new(),
            template_up_to_date: false,
            as_code_events: Vec::new(),
            applications: BTreeMap::new(),
            environments: BTreeMap::new(),
            pipelines: BTreeMap::new(),
            project_integrations: BTreeMap::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Conjunctive filters for workflow listing. `None` / empty means the
/// filter is not applied at all.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkflowFilters {
    pub project_key: Option<String>,
    pub workflow_name: Option<String>,
    pub vcs_server: Option<String>,
    pub repository: Option<String>,
    /// Matches workflows whose project is visible to any of these groups.
    #[serde(default)]
    pub group_ids: Vec<DbId>,
}

/// Filters, ordering and pagination of a workflow listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkflowListQuery {
    #[serde(default)]
    pub filters: WorkflowFilters,
    /// Rows to skip; `0` emits no `OFFSET`.
    #[serde(default)]
    pub offset: i64,
    /// Maximum rows; `0` emits no `LIMIT`.
    #[serde(default)]
    pub limit: i64,
    /// Order by project key then workflow name, ascending when true.
    #[serde(default)]
    pub ascending: bool,
}
