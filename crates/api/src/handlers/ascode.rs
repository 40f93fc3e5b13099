//! Handlers for as-code synchronization.
//!
//! Both migrate and update answer as soon as the repositories service has
//! accepted the push; the outcome is followed through the operation
//! status endpoint and the event bus.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use conveyor_ascode::{SyncRequest, WorkflowUpdate};
use conveyor_core::workflow::WorkflowData;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::actor::RequestActor;
use crate::query::SyncParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body of an as-code update.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateWorkflowBody {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub description: String,
    pub workflow_data: WorkflowData,
}

impl From<UpdateWorkflowBody> for WorkflowUpdate {
    fn from(body: UpdateWorkflowBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            workflow_data: body.workflow_data,
        }
    }
}

/// POST /api/v1/projects/{key}/workflows/{name}/ascode
///
/// With `migrate=true`, puts the workflow under its root application's
/// repository and ignores the body. Otherwise the body is the new
/// version of an as-code workflow to push.
pub async fn post_ascode(
    State(state): State<AppState>,
    RequestActor(actor): RequestActor,
    Path((project_key, workflow_name)): Path<(String, String)>,
    Query(params): Query<SyncParams>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let request = SyncRequest {
        branch: params.branch,
        message: params.message,
    };

    let operation = if params.migrate {
        state
            .ascode
            .request_migrate(&project_key, &workflow_name, request, &actor)
            .await?
    } else {
        let update = parse_update(&body)?;
        state
            .ascode
            .request_update(&project_key, &workflow_name, update, request, &actor)
            .await?
    };

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: operation })))
}

/// GET /api/v1/ascode/operations/{uuid}
pub async fn get_operation(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let operation = state.ascode.sync_status(uuid).await?;
    Ok(Json(DataResponse { data: operation }))
}

fn parse_update(body: &[u8]) -> AppResult<WorkflowUpdate> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest(
            "a workflow body is required unless migrate=true".into(),
        ));
    }
    let body: UpdateWorkflowBody = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid workflow body: {e}")))?;
    body.validate()?;
    Ok(body.into())
}
