//! One batched fetch per reference kind.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;

use conveyor_core::references::{collect_references, ReferenceKind};
use conveyor_core::types::DbId;
use conveyor_db::models::application::Application;
use conveyor_db::models::environment::Environment;
use conveyor_db::models::integration::ProjectIntegration;
use conveyor_db::models::pipeline::Pipeline;
use conveyor_db::models::workflow::Workflow;
use conveyor_db::store::{EntityStore, StoreResult};

/// An entity kind that workflow nodes reference by id.
///
/// Ties together the context field a node uses, the batched store lookup,
/// and the workflow map the resolved snapshots land in.
pub trait ReferenceTarget: Clone + Send + Sync + Sized {
    const KIND: ReferenceKind;

    fn id(&self) -> DbId;

    fn fetch(
        store: &dyn EntityStore,
        ids: &[DbId],
    ) -> impl Future<Output = StoreResult<Vec<Self>>> + Send;

    /// The workflow map owned by this kind.
    fn slot(workflow: &mut Workflow) -> &mut BTreeMap<DbId, Self>;
}

impl ReferenceTarget for Application {
    const KIND: ReferenceKind = ReferenceKind::Application;

    fn id(&self) -> DbId {
        self.id
    }

    async fn fetch(store: &dyn EntityStore, ids: &[DbId]) -> StoreResult<Vec<Self>> {
        store.load_applications(ids).await
    }

    fn slot(workflow: &mut Workflow) -> &mut BTreeMap<DbId, Self> {
        &mut workflow.applications
    }
}

impl ReferenceTarget for Environment {
    const KIND: ReferenceKind = ReferenceKind::Environment;

    fn id(&self) -> DbId {
        self.id
    }

    async fn fetch(store: &dyn EntityStore, ids: &[DbId]) -> StoreResult<Vec<Self>> {
        store.load_environments(ids).await
    }

    fn slot(workflow: &mut Workflow) -> &mut BTreeMap<DbId, Self> {
        &mut workflow.environments
    }
}

impl ReferenceTarget for Pipeline {
    const KIND: ReferenceKind = ReferenceKind::Pipeline;

    fn id(&self) -> DbId {
        self.id
    }

    async fn fetch(store: &dyn EntityStore, ids: &[DbId]) -> StoreResult<Vec<Self>> {
        store.load_pipelines(ids).await
    }

    fn slot(workflow: &mut Workflow) -> &mut BTreeMap<DbId, Self> {
        &mut workflow.pipelines
    }
}

impl ReferenceTarget for ProjectIntegration {
    const KIND: ReferenceKind = ReferenceKind::Integration;

    fn id(&self) -> DbId {
        self.id
    }

    async fn fetch(store: &dyn EntityStore, ids: &[DbId]) -> StoreResult<Vec<Self>> {
        store.load_integrations(ids).await
    }

    fn slot(workflow: &mut Workflow) -> &mut BTreeMap<DbId, Self> {
        &mut workflow.project_integrations
    }
}

/// Fetch every id in `ids` with a single store call and index the result.
///
/// No call is made for an empty set. Ids the store did not return are
/// absent from the index.
pub async fn load_index<T: ReferenceTarget>(
    store: &dyn EntityStore,
    ids: &BTreeSet<DbId>,
) -> StoreResult<HashMap<DbId, T>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let keys: Vec<DbId> = ids.iter().copied().collect();
    let entities = T::fetch(store, &keys).await?;

    tracing::debug!(
        kind = T::KIND.entity_name(),
        requested = keys.len(),
        found = entities.len(),
        "Bulk loaded references"
    );

    Ok(entities.into_iter().map(|e| (e.id(), e)).collect())
}

/// Index of every `T` referenced by the batch.
pub async fn load_referenced<T: ReferenceTarget>(
    store: &dyn EntityStore,
    workflows: &[Workflow],
) -> StoreResult<HashMap<DbId, T>> {
    let ids = collect_references(workflows.iter().map(|w| &w.workflow_data), T::KIND);
    load_index(store, &ids).await
}
