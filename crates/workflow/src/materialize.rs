//! Copy fetched snapshots into the per-kind workflow maps.

use std::collections::{BTreeMap, HashMap};

use conveyor_core::error::CoreError;
use conveyor_core::references::node_references;
use conveyor_core::types::DbId;
use conveyor_db::models::workflow::Workflow;

use crate::bulk::ReferenceTarget;

/// Fill the `T` map of every workflow from `index`.
///
/// All maps are computed before any workflow is touched: on a dangling
/// reference the batch is left exactly as it was. A rerun replaces the
/// maps wholesale, so each referenced id maps to one snapshot.
pub fn materialize<T: ReferenceTarget>(
    workflows: &mut [Workflow],
    index: &HashMap<DbId, T>,
) -> Result<(), CoreError> {
    let mut maps = Vec::with_capacity(workflows.len());

    for workflow in workflows.iter() {
        let mut map = BTreeMap::new();
        for (node_id, id) in node_references(&workflow.workflow_data, T::KIND) {
            let entity = index.get(&id).ok_or(CoreError::UnresolvedReference {
                entity: T::KIND.entity_name(),
                id,
                workflow_id: workflow.id,
                node_id,
            })?;
            map.entry(id).or_insert_with(|| entity.clone());
        }
        maps.push(map);
    }

    for (workflow, map) in workflows.iter_mut().zip(maps) {
        *T::slot(workflow) = map;
    }
    Ok(())
}
