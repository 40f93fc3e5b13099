//! Harness for orchestrator tests: in-memory store, scripted repositories
//! service, real cache, reconciler and runner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use conveyor_ascode::{
    AsCodeDeps, AsCodeOrchestrator, BackgroundRunner, GitOperationService, GitServiceError,
    JsonWorkflowExporter, MokaOperationCache, OperationReconciler, PushRequest, ReconcileSettings,
    ReconciliationCollaborator,
};
use conveyor_core::operation::{Operation, OperationStatus, PullRequestInfo};
use conveyor_core::types::DbId;
use conveyor_core::workflow::{Node, NodeContext, WorkflowData};
use conveyor_db::memory::InMemoryStore;
use conveyor_db::models::application::Application;
use conveyor_db::models::ascode_event::AsCodeEvent;
use conveyor_db::models::environment::Environment;
use conveyor_db::models::integration::ProjectIntegration;
use conveyor_db::models::pipeline::Pipeline;
use conveyor_db::models::template::TemplateInstance;
use conveyor_db::models::workflow::Workflow;
use conveyor_db::store::{EntityStore, StoreResult};
use conveyor_events::EventBus;
use sqlx::types::Json;
use tokio::sync::Notify;
use uuid::Uuid;

pub const REPO_URL: &str = "https://github.com/org/app.git";

// ---------------------------------------------------------------------------
// Scripted repositories service
// ---------------------------------------------------------------------------

pub struct FakeGitService {
    pub pushes: Mutex<Vec<Operation>>,
    pub final_status: OperationStatus,
    pub pull_request: Option<PullRequestInfo>,
    /// When set, status polls wait for a notification.
    pub hold: Option<Arc<Notify>>,
}

impl FakeGitService {
    pub fn completing(final_status: OperationStatus, pull_request: Option<PullRequestInfo>) -> Self {
        Self {
            pushes: Mutex::new(Vec::new()),
            final_status,
            pull_request,
            hold: None,
        }
    }

    pub fn pushed(&self) -> Vec<Operation> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl GitOperationService for FakeGitService {
    async fn push(&self, request: PushRequest) -> Result<Operation, GitServiceError> {
        let mut operation = request.into_operation();
        operation.url = REPO_URL.into();
        self.pushes.lock().unwrap().push(operation.clone());
        Ok(operation)
    }

    async fn fetch_operation(&self, uuid: Uuid) -> Result<Operation, GitServiceError> {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        let mut operation = self
            .pushes
            .lock()
            .unwrap()
            .iter()
            .find(|op| op.uuid == uuid)
            .cloned()
            .ok_or(GitServiceError::Api {
                status: 404,
                body: "operation not found".into(),
            })?;
        operation.status = self.final_status;
        operation.pull_request = self.pull_request.clone();
        if self.final_status == OperationStatus::Error {
            operation.error = Some("push rejected".into());
        }
        Ok(operation)
    }
}

// ---------------------------------------------------------------------------
// Entity store that pauses after the first as-code event lookup
// ---------------------------------------------------------------------------

pub struct EventGate {
    inner: Arc<InMemoryStore>,
    armed: AtomicBool,
    /// Notified once the first lookup has returned its rows.
    pub parked: Notify,
    /// Lets the parked lookup hand its rows back.
    pub release: Notify,
}

impl EventGate {
    fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(true),
            parked: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl EntityStore for EventGate {
    async fn load_applications(&self, ids: &[DbId]) -> StoreResult<Vec<Application>> {
        self.inner.load_applications(ids).await
    }

    async fn load_environments(&self, ids: &[DbId]) -> StoreResult<Vec<Environment>> {
        self.inner.load_environments(ids).await
    }

    async fn load_pipelines(&self, ids: &[DbId]) -> StoreResult<Vec<Pipeline>> {
        self.inner.load_pipelines(ids).await
    }

    async fn load_integrations(&self, ids: &[DbId]) -> StoreResult<Vec<ProjectIntegration>> {
        self.inner.load_integrations(ids).await
    }

    async fn load_as_code_events_by_repositories(
        &self,
        repositories: &[String],
    ) -> StoreResult<Vec<AsCodeEvent>> {
        self.inner.load_as_code_events_by_repositories(repositories).await
    }

    async fn load_as_code_events_by_workflow_ids(
        &self,
        workflow_ids: &[DbId],
    ) -> StoreResult<Vec<AsCodeEvent>> {
        let rows = self.inner.load_as_code_events_by_workflow_ids(workflow_ids).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.parked.notify_one();
            self.release.notified().await;
        }
        rows
    }

    async fn load_template_instances_by_workflow_ids(
        &self,
        workflow_ids: &[DbId],
    ) -> StoreResult<Vec<TemplateInstance>> {
        self.inner.load_template_instances_by_workflow_ids(workflow_ids).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub git: Arc<FakeGitService>,
    pub bus: Arc<EventBus>,
    pub orchestrator: AsCodeOrchestrator,
}

impl Harness {
    pub fn new(git: FakeGitService) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::build(store.clone(), store, git, None)
    }

    pub fn with_reconciler(git: FakeGitService, reconciler: Arc<dyn ReconciliationCollaborator>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::build(store.clone(), store, git, Some(reconciler))
    }

    /// The orchestrator's entity lookups go through an [`EventGate`].
    pub fn with_event_gate(git: FakeGitService) -> (Self, Arc<EventGate>) {
        let store = Arc::new(InMemoryStore::new());
        let gate = Arc::new(EventGate::new(store.clone()));
        (Self::build(store, gate.clone(), git, None), gate)
    }

    fn build(
        store: Arc<InMemoryStore>,
        entities: Arc<dyn EntityStore>,
        git: FakeGitService,
        reconciler: Option<Arc<dyn ReconciliationCollaborator>>,
    ) -> Self {
        let git = Arc::new(git);
        let cache = Arc::new(MokaOperationCache::new());
        let bus = Arc::new(EventBus::default());

        let reconciler: Arc<dyn ReconciliationCollaborator> = match reconciler {
            Some(reconciler) => reconciler,
            None => Arc::new(OperationReconciler::new(
                git.clone(),
                cache.clone(),
                store.clone(),
                ReconcileSettings {
                    poll_interval: Duration::from_millis(1),
                    max_attempts: 5,
                },
            )),
        };

        let orchestrator = AsCodeOrchestrator::new(AsCodeDeps {
            workflows: store.clone(),
            entities,
            git: git.clone(),
            exporter: Arc::new(JsonWorkflowExporter::new(store.clone(), store.clone())),
            cache: cache.clone(),
            reconciler,
            events: bus.clone(),
            runner: BackgroundRunner::new(4),
        });

        Self {
            store,
            git,
            bus,
            orchestrator,
        }
    }

    pub async fn settle(&self) {
        self.orchestrator.runner().wait_idle().await;
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn application(id: DbId, with_vcs: bool) -> Application {
    Application {
        id,
        project_id: 1,
        name: format!("app-{id}"),
        description: None,
        vcs_server: if with_vcs { "github".into() } else { String::new() },
        repo_fullname: if with_vcs { "org/app".into() } else { String::new() },
        repository_strategy: Json(Default::default()),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

pub fn pipeline(id: DbId, name: &str) -> Pipeline {
    Pipeline {
        id,
        project_id: 1,
        name: name.into(),
        description: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

pub fn root_context(application_id: DbId, pipeline_id: DbId) -> NodeContext {
    NodeContext {
        application_id,
        pipeline_id,
        ..NodeContext::default()
    }
}

pub fn workflow(id: DbId, name: &str, data: WorkflowData) -> Workflow {
    let now = chrono::Utc::now();
    Workflow {
        id,
        project_id: 1,
        project_key: "PROJ".into(),
        name: name.into(),
        description: String::new(),
        icon: String::new(),
        from_repository: String::new(),
        workflow_data: data,
        template_instance: None,
        from_template: String::new(),
        template_up_to_date: false,
        as_code_events: Vec::new(),
        applications: Default::default(),
        environments: Default::default(),
        pipelines: Default::default(),
        project_integrations: Default::default(),
        created_at: now,
        updated_at: now,
    }
}

/// Project `PROJ` with workflow `w1` (id 1) rooted on application 7 and
/// pipeline 42.
pub fn seed_w1(store: &InMemoryStore, with_vcs: bool) {
    store.insert_application(application(7, with_vcs));
    store.insert_pipeline(pipeline(42, "build"));
    store.insert_workflow(workflow(
        1,
        "w1",
        WorkflowData::new(Node::pipeline(10, "build", root_context(7, 42))),
    ));
}
