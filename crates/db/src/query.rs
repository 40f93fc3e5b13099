//! Workflow listing query composer.
//!
//! Builds one query against a denormalized view of workflows joined with
//! their root application, their project, and the groups allowed to see
//! the project. Filters are AND-ed; filters left unset are not emitted.

use conveyor_core::types::DbId;

use crate::models::workflow::WorkflowListQuery;

/// Base query. `selected_workflow` exposes the filterable columns.
const WORKFLOW_LIST_BASE: &str = "\
WITH \
workflow_root_application_id AS ( \
    SELECT id AS workflow_id, project_id, name AS workflow_name, \
        (workflow_data -> 'node' -> 'context' ->> 'application_id')::BIGINT AS root_application_id \
    FROM workflows \
), \
project_permission AS ( \
    SELECT project_id, ARRAY_AGG(group_id) AS groups \
    FROM project_groups \
    GROUP BY project_id \
), \
selected_workflow AS ( \
    SELECT wra.workflow_id, projects.key AS project_key, wra.workflow_name, \
        applications.vcs_server, applications.repo_fullname, \
        COALESCE(project_permission.groups, '{}'::BIGINT[]) AS groups \
    FROM workflow_root_application_id wra \
    LEFT OUTER JOIN applications ON applications.id = wra.root_application_id \
    JOIN projects ON projects.id = wra.project_id \
    LEFT OUTER JOIN project_permission ON project_permission.project_id = projects.id \
) \
SELECT workflows.id, workflows.project_id, selected_workflow.project_key, workflows.name, \
    workflows.description, workflows.icon, workflows.from_repository, workflows.workflow_data, \
    workflows.created_at, workflows.updated_at \
FROM workflows \
JOIN selected_workflow ON selected_workflow.workflow_id = workflows.id";

/// A positional argument of a composed query, bound in order.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArg {
    Text(String),
    Ids(Vec<DbId>),
}

/// SQL text plus its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub sql: String,
    pub args: Vec<QueryArg>,
}

impl WorkflowListQuery {
    /// Compose the listing SQL. Placeholders are numbered in filter order.
    pub fn compose(&self) -> ComposedQuery {
        let f = &self.filters;
        let mut conditions: Vec<&str> = Vec::new();
        let mut args = Vec::new();

        let text_filters = [
            ("selected_workflow.project_key", &f.project_key),
            ("selected_workflow.workflow_name", &f.workflow_name),
            ("selected_workflow.vcs_server", &f.vcs_server),
            ("selected_workflow.repo_fullname", &f.repository),
        ];
        for (column, value) in text_filters {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                conditions.push(column);
                args.push(QueryArg::Text(value.to_string()));
            }
        }
        let group_filter = !f.group_ids.is_empty();
        if group_filter {
            args.push(QueryArg::Ids(f.group_ids.clone()));
        }

        let mut sql = String::from(WORKFLOW_LIST_BASE);
        let mut clauses: Vec<String> = conditions
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = ${}", i + 1))
            .collect();
        if group_filter {
            clauses.push(format!("selected_workflow.groups && ${}", clauses.len() + 1));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        sql.push_str(" ORDER BY selected_workflow.project_key, selected_workflow.workflow_name ");
        sql.push_str(if self.ascending { "ASC" } else { "DESC" });

        if self.offset != 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
        if self.limit != 0 {
            sql.push_str(&format!(" LIMIT {}", self.limit));
        }

        tracing::debug!(sql = %sql, args = args.len(), "Composed workflow listing query");

        ComposedQuery { sql, args }
    }
}
