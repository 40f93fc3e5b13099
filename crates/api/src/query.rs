//! Query parameter types shared by the handlers.

use conveyor_core::types::DbId;
use conveyor_db::models::workflow::{WorkflowFilters, WorkflowListQuery};
use conveyor_workflow::LoaderFlags;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Largest page a listing returns.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// `?name=&vcs_server=&repository=&group_ids=&with_*=&limit=&offset=&ascending=`
#[derive(Debug, Default, Deserialize)]
pub struct WorkflowListParams {
    /// Only honoured on the cross-project listing.
    pub project_key: Option<String>,
    pub name: Option<String>,
    pub vcs_server: Option<String>,
    pub repository: Option<String>,
    /// Comma-separated group ids.
    pub group_ids: Option<String>,

    #[serde(default)]
    pub with_applications: bool,
    #[serde(default)]
    pub with_environments: bool,
    #[serde(default)]
    pub with_pipelines: bool,
    #[serde(default)]
    pub with_integrations: bool,
    #[serde(default)]
    pub with_icon: bool,
    #[serde(default)]
    pub with_as_code_events: bool,
    #[serde(default)]
    pub with_template: bool,

    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub ascending: Option<bool>,
}

impl WorkflowListParams {
    pub fn loader_flags(&self) -> LoaderFlags {
        LoaderFlags {
            with_applications: self.with_applications,
            with_environments: self.with_environments,
            with_pipelines: self.with_pipelines,
            with_integrations: self.with_integrations,
            with_icon: self.with_icon,
            with_as_code_events: self.with_as_code_events,
            with_template: self.with_template,
        }
    }

    /// Listing query scoped to `project_key` when given, else to the
    /// `project_key` parameter.
    pub fn to_query(&self, project_key: Option<&str>) -> AppResult<WorkflowListQuery> {
        let project_key = project_key
            .map(str::to_string)
            .or_else(|| self.project_key.clone());

        Ok(WorkflowListQuery {
            filters: WorkflowFilters {
                project_key,
                workflow_name: self.name.clone(),
                vcs_server: self.vcs_server.clone(),
                repository: self.repository.clone(),
                group_ids: parse_ids(self.group_ids.as_deref())?,
            },
            offset: self.offset.unwrap_or(0).max(0),
            limit: self.limit.unwrap_or(0).clamp(0, MAX_PAGE_SIZE),
            ascending: self.ascending.unwrap_or(true),
        })
    }
}

fn parse_ids(raw: Option<&str>) -> AppResult<Vec<DbId>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<DbId>()
                .map_err(|_| AppError::BadRequest(format!("invalid group id '{s}'")))
        })
        .collect()
}

/// `?migrate=&branch=&message=` of a synchronization request.
#[derive(Debug, Default, Deserialize)]
pub struct SyncParams {
    #[serde(default)]
    pub migrate: bool,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub message: String,
}
