//! Handlers for workflow listings with bulk reference resolution.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use conveyor_workflow::list_workflows;

use crate::error::AppResult;
use crate::query::WorkflowListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/projects/{key}/workflows
///
/// Workflows of one project, with the references selected by the
/// `with_*` flags resolved.
pub async fn list_project_workflows(
    State(state): State<AppState>,
    Path(project_key): Path<String>,
    Query(params): Query<WorkflowListParams>,
) -> AppResult<impl IntoResponse> {
    let query = params.to_query(Some(&project_key))?;
    let workflows = list_workflows(
        state.workflows.as_ref(),
        state.entities.as_ref(),
        &query,
        params.loader_flags(),
    )
    .await?;

    Ok(Json(DataResponse { data: workflows }))
}

/// GET /api/v1/workflows
pub async fn list_all_workflows(
    State(state): State<AppState>,
    Query(params): Query<WorkflowListParams>,
) -> AppResult<impl IntoResponse> {
    let query = params.to_query(None)?;
    let workflows = list_workflows(
        state.workflows.as_ref(),
        state.entities.as_ref(),
        &query,
        params.loader_flags(),
    )
    .await?;

    Ok(Json(DataResponse { data: workflows }))
}
