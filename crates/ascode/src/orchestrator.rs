//! As-code synchronization orchestrator.
//!
//! Drives migrate and update requests through
//! `NotAsCode | AsCode -> OperationPending -> Reconciling -> AsCode | Failed`.
//! The synchronous part validates the request, pushes, and returns the
//! operation; the rest runs on the [`BackgroundRunner`].

use std::collections::HashMap;
use std::slice;
use std::sync::Arc;

use conveyor_core::ascode::{
    ensure_migratable, ensure_repository_webhook, ensure_updatable, AsCodeEntityType, SyncState,
};
use conveyor_core::error::CoreError;
use conveyor_core::naming::{normalize_node_names, validate_structure};
use conveyor_core::operation::Operation;
use conveyor_core::types::{Actor, DbId};
use conveyor_core::workflow::WorkflowData;
use conveyor_db::models::application::Application;
use conveyor_db::models::pipeline::Pipeline;
use conveyor_db::models::workflow::Workflow;
use conveyor_db::store::{EntityStore, WorkflowStore};
use conveyor_events::EventBus;
use conveyor_workflow::passes::{self, LoaderPass};
use conveyor_workflow::{LoadError, LoadResult};
use serde::Deserialize;
use uuid::Uuid;

use crate::background::BackgroundRunner;
use crate::cache::OperationCache;
use crate::error::SyncResult;
use crate::export::{EncryptionMode, ExportOptions, ExportPayload, WorkflowExporter};
use crate::git::{GitOperationService, PushRequest};
use crate::reconcile::{EntityData, ReconciliationCollaborator};
use crate::registry::{SyncGuard, SyncRegistry, SyncSlot};

/// Target branch and commit message of a synchronization. Empty values
/// leave the choice to the repositories service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub message: String,
}

/// Replacement workflow submitted by an update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowUpdate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub workflow_data: WorkflowData,
}

/// Collaborators of the orchestrator.
pub struct AsCodeDeps {
    pub workflows: Arc<dyn WorkflowStore>,
    pub entities: Arc<dyn EntityStore>,
    pub git: Arc<dyn GitOperationService>,
    pub exporter: Arc<dyn WorkflowExporter>,
    pub cache: Arc<dyn OperationCache>,
    pub reconciler: Arc<dyn ReconciliationCollaborator>,
    pub events: Arc<EventBus>,
    pub runner: BackgroundRunner,
}

pub struct AsCodeOrchestrator {
    workflows: Arc<dyn WorkflowStore>,
    entities: Arc<dyn EntityStore>,
    git: Arc<dyn GitOperationService>,
    exporter: Arc<dyn WorkflowExporter>,
    cache: Arc<dyn OperationCache>,
    reconciler: Arc<dyn ReconciliationCollaborator>,
    events: Arc<EventBus>,
    runner: BackgroundRunner,
    registry: Arc<SyncRegistry>,
}

impl AsCodeOrchestrator {
    pub fn new(deps: AsCodeDeps) -> Self {
        Self {
            workflows: deps.workflows,
            entities: deps.entities,
            git: deps.git,
            exporter: deps.exporter,
            cache: deps.cache,
            reconciler: deps.reconciler,
            events: deps.events,
            runner: deps.runner,
            registry: Arc::new(SyncRegistry::new()),
        }
    }

    pub fn runner(&self) -> &BackgroundRunner {
        &self.runner
    }

    /// The synchronization currently running for `workflow_id`, if any.
    pub fn in_flight(&self, workflow_id: DbId) -> Option<SyncSlot> {
        self.registry.get(workflow_id)
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Latest cached state of an operation.
    pub async fn sync_status(&self, uuid: Uuid) -> SyncResult<Operation> {
        self.cache
            .get(uuid)
            .await
            .ok_or_else(|| CoreError::not_found("operation", uuid).into())
    }

    // -----------------------------------------------------------------------
    // Migrate
    // -----------------------------------------------------------------------

    /// Put a workflow under its root application's repository.
    pub async fn request_migrate(
        &self,
        project_key: &str,
        workflow_name: &str,
        request: SyncRequest,
        actor: &Actor,
    ) -> SyncResult<Operation> {
        let mut workflow = self.load_workflow(project_key, workflow_name).await?;
        // Held from here so the preconditions below cannot go stale.
        let guard = self.registry.acquire(workflow.id, &workflow.name)?;

        passes::load_as_code_events_by_workflow(self.entities.as_ref(), slice::from_mut(&mut workflow))
            .await?;
        ensure_migratable(&workflow.from_repository, workflow.as_code_events.len())?;

        let application = self.root_application(&workflow).await?;
        if !application.has_vcs() {
            return Err(CoreError::InvalidRequest(
                "no vcs configuration set on the root application of the given workflow".into(),
            )
            .into());
        }

        log_transition(workflow.id, SyncState::NotAsCode, SyncState::OperationPending);

        if ensure_repository_webhook(&mut workflow.workflow_data) {
            self.workflows.update_workflow(&workflow).await?;
            tracing::info!(workflow_id = workflow.id, "Added repository webhook to workflow");
        }

        let payload = self
            .exporter
            .pull(
                project_key,
                &workflow.name,
                EncryptionMode::BuiltinKey,
                ExportOptions {
                    skip_if_only_one_repo_webhook: true,
                },
            )
            .await?;
        let operation = self.push(&application, request, payload).await?;

        let entity = EntityData {
            name: workflow.name.clone(),
            id: workflow.id,
            entity_type: AsCodeEntityType::Workflow,
            from_repo: operation.repository().to_string(),
            operation_uuid: operation.uuid,
        };
        self.launch_reconciliation(project_key, application, entity, actor.clone(), guard);

        Ok(operation)
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Push a new version of an as-code workflow to its repository.
    pub async fn request_update(
        &self,
        project_key: &str,
        workflow_name: &str,
        update: WorkflowUpdate,
        request: SyncRequest,
        actor: &Actor,
    ) -> SyncResult<Operation> {
        let mut stored = self.load_workflow(project_key, workflow_name).await?;
        let guard = self.registry.acquire(stored.id, &stored.name)?;

        passes::load_templates(self.entities.as_ref(), slice::from_mut(&mut stored)).await?;
        ensure_updatable(&stored.from_repository, stored.is_from_template())?;

        let application = self.root_application(&stored).await?;

        let mut candidate = stored.clone();
        candidate.name = update.name;
        candidate.description = update.description;
        candidate.workflow_data = update.workflow_data;
        self.prepare_candidate(&mut candidate).await?;

        log_transition(stored.id, SyncState::AsCode, SyncState::OperationPending);

        let payload = self
            .exporter
            .export(
                &candidate,
                ExportOptions {
                    skip_if_only_one_repo_webhook: true,
                },
            )
            .await?;
        let operation = self.push(&application, request, payload).await?;

        let entity = EntityData {
            name: stored.name.clone(),
            id: stored.id,
            entity_type: AsCodeEntityType::Workflow,
            from_repo: stored.from_repository.clone(),
            operation_uuid: operation.uuid,
        };
        self.launch_reconciliation(project_key, application, entity, actor.clone(), guard);

        Ok(operation)
    }

    /// Normalize node names, then check the structure and that every
    /// referenced entity exists.
    async fn prepare_candidate(&self, candidate: &mut Workflow) -> SyncResult<()> {
        let entities = self.entities.as_ref();

        as_validation(passes::resolve::<Pipeline>(entities, slice::from_mut(candidate)).await)?;
        let pipeline_names: HashMap<DbId, String> = candidate
            .pipelines
            .iter()
            .map(|(id, p)| (*id, p.name.clone()))
            .collect();
        normalize_node_names(&mut candidate.workflow_data, &pipeline_names);
        validate_structure(&candidate.name, &candidate.workflow_data)?;

        for pass in [
            LoaderPass::Applications,
            LoaderPass::Environments,
            LoaderPass::Integrations,
        ] {
            as_validation(passes::run_pass(entities, slice::from_mut(candidate), pass).await)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Shared steps
    // -----------------------------------------------------------------------

    async fn load_workflow(&self, project_key: &str, workflow_name: &str) -> SyncResult<Workflow> {
        self.workflows
            .find_workflow(project_key, workflow_name)
            .await?
            .ok_or_else(|| CoreError::not_found("workflow", format!("{project_key}/{workflow_name}")).into())
    }

    async fn root_application(&self, workflow: &Workflow) -> SyncResult<Application> {
        let missing =
            || CoreError::InvalidRequest("cannot find the root application of the workflow".into());
        let id = workflow.workflow_data.root_application_id().ok_or_else(missing)?;
        Ok(self.workflows.find_application(id).await?.ok_or_else(missing)?)
    }

    async fn push(
        &self,
        application: &Application,
        request: SyncRequest,
        payload: ExportPayload,
    ) -> SyncResult<Operation> {
        let operation = self
            .git
            .push(PushRequest {
                vcs_server: application.vcs_server.clone(),
                repo_fullname: application.repo_fullname.clone(),
                branch: request.branch,
                message: request.message,
                strategy: application.repository_strategy.0.clone(),
                payload,
            })
            .await?
            .without_credentials();
        self.cache.set(operation.clone()).await;

        tracing::info!(
            operation_uuid = %operation.uuid,
            repo = %operation.repo_fullname,
            "Push operation accepted"
        );
        Ok(operation)
    }

    /// Follow the operation in the background and publish its event. The
    /// guard is held until the task ends.
    fn launch_reconciliation(
        &self,
        project_key: &str,
        application: Application,
        entity: EntityData,
        actor: Actor,
        guard: SyncGuard,
    ) {
        guard.attach(entity.operation_uuid);
        let reconciler = Arc::clone(&self.reconciler);
        let events = Arc::clone(&self.events);
        let project_key = project_key.to_string();
        let name = format!("ascode-reconcile-{}", entity.operation_uuid);

        self.runner.spawn(name, async move {
            let _guard = guard;
            let workflow_id = entity.id;
            let operation_uuid = entity.operation_uuid;
            log_transition(workflow_id, SyncState::OperationPending, SyncState::Reconciling);

            match reconciler
                .update_as_code_result(&project_key, &application, entity, &actor)
                .await
            {
                Ok(Some(event)) => {
                    log_transition(workflow_id, SyncState::Reconciling, SyncState::AsCode);
                    events.publish_as_code(&project_key, &event, &actor);
                }
                Ok(None) => {
                    tracing::debug!(
                        workflow_id,
                        operation_uuid = %operation_uuid,
                        "No observable outcome"
                    );
                }
                Err(e) => {
                    log_transition(workflow_id, SyncState::Reconciling, SyncState::Failed);
                    tracing::error!(
                        workflow_id,
                        operation_uuid = %operation_uuid,
                        error = %e,
                        "As-code reconciliation failed"
                    );
                }
            }
        });
    }
}

fn log_transition(workflow_id: DbId, from: SyncState, to: SyncState) {
    debug_assert!(from.can_transition_to(to), "{from:?} -> {to:?}");
    tracing::info!(
        workflow_id,
        from = from.as_str(),
        to = to.as_str(),
        "As-code sync state changed"
    );
}

/// Dangling references in a submitted workflow are a validation failure
/// of the request rather than a missing resource.
fn as_validation(result: LoadResult<()>) -> SyncResult<()> {
    match result {
        Err(LoadError::Core(CoreError::UnresolvedReference { entity, id, node_id, .. })) => {
            Err(CoreError::Validation(format!(
                "{entity} {id} referenced by node {node_id} does not exist"
            ))
            .into())
        }
        other => Ok(other?),
    }
}
