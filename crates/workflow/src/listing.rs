//! Workflow listing with reference resolution.

use conveyor_db::models::workflow::{Workflow, WorkflowListQuery};
use conveyor_db::store::{EntityStore, WorkflowStore};

use crate::error::LoadResult;
use crate::passes::{run_passes, LoaderFlags};

/// List workflows matching `query` and resolve the references `flags`
/// ask for. Any pass failure fails the whole listing.
pub async fn list_workflows(
    workflows: &dyn WorkflowStore,
    entities: &dyn EntityStore,
    query: &WorkflowListQuery,
    flags: LoaderFlags,
) -> LoadResult<Vec<Workflow>> {
    let mut listed = workflows.list_workflows(query).await?;
    run_passes(entities, &mut listed, flags).await?;

    tracing::debug!(
        count = listed.len(),
        project_key = query.filters.project_key.as_deref().unwrap_or(""),
        "Listed workflows"
    );
    Ok(listed)
}
