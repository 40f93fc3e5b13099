use axum::routing::get;
use axum::Router;

use crate::handlers::workflow;
use crate::state::AppState;

/// ```text
/// GET /workflows                   -> list_all_workflows
/// GET /projects/{key}/workflows    -> list_project_workflows
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workflows", get(workflow::list_all_workflows))
        .route(
            "/projects/{key}/workflows",
            get(workflow::list_project_workflows),
        )
}
