pub mod ascode;
pub mod health;
pub mod workflow;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /workflows                                         cross-project listing
/// /projects/{key}/workflows                          project listing
/// /projects/{key}/workflows/{name}/ascode            migrate or update (POST)
/// /ascode/operations/{uuid}                          operation status
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(workflow::router())
        .nest("/ascode", ascode::router())
        .merge(ascode::workflow_router())
}
