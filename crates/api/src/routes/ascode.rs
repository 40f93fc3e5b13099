//! Route definitions for as-code synchronization.
//!
//! Two routers are provided:
//! - `router()` for operation routes mounted at `/ascode`
//! - `workflow_router()` for workflow-scoped routes

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::ascode;
use crate::state::AppState;

/// ```text
/// GET /operations/{uuid}    -> get_operation
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/operations/{uuid}", get(ascode::get_operation))
}

/// ```text
/// POST /projects/{key}/workflows/{name}/ascode    -> post_ascode
/// ```
pub fn workflow_router() -> Router<AppState> {
    Router::new().route(
        "/projects/{key}/workflows/{name}/ascode",
        post(ascode::post_ascode),
    )
}
