//! Test application over the in-memory store and a scripted repositories
//! service, plus request helpers.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use conveyor_api::config::ServerConfig;
use conveyor_api::router::build_app_router;
use conveyor_api::state::AppState;
use conveyor_ascode::{
    AsCodeDeps, AsCodeOrchestrator, BackgroundRunner, GitOperationService, GitServiceError,
    JsonWorkflowExporter, MokaOperationCache, OperationReconciler, PushRequest, ReconcileSettings,
};
use conveyor_core::operation::{Operation, OperationStatus};
use conveyor_core::types::DbId;
use conveyor_core::workflow::{Node, NodeContext, WorkflowData};
use conveyor_db::memory::InMemoryStore;
use conveyor_db::models::application::Application;
use conveyor_db::models::pipeline::Pipeline;
use conveyor_db::models::workflow::Workflow;
use conveyor_events::EventBus;
use http_body_util::BodyExt;
use sqlx::types::Json;
use tower::ServiceExt;
use uuid::Uuid;

pub const REPO_URL: &str = "https://github.com/org/app.git";

/// Repositories service that completes every push on the first poll.
#[derive(Default)]
pub struct CompletingGitService {
    pushes: Mutex<Vec<Operation>>,
}

#[async_trait]
impl GitOperationService for CompletingGitService {
    async fn push(&self, request: PushRequest) -> Result<Operation, GitServiceError> {
        let mut operation = request.into_operation();
        operation.url = REPO_URL.into();
        self.pushes.lock().unwrap().push(operation.clone());
        Ok(operation)
    }

    async fn fetch_operation(&self, uuid: Uuid) -> Result<Operation, GitServiceError> {
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
        operation.status = OperationStatus::Done;
        Ok(operation)
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub ascode: Arc<AsCodeOrchestrator>,
    pub bus: Arc<EventBus>,
}

impl TestApp {
    /// Wait for background reconciliations to finish.
    pub async fn settle(&self) {
        self.ascode.runner().wait_idle().await;
    }
}

/// Build the full application router with all middleware layers over a
/// fresh in-memory store.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(InMemoryStore::new());
    let git = Arc::new(CompletingGitService::default());
    let cache = Arc::new(MokaOperationCache::new());
    let bus = Arc::new(EventBus::default());

    let reconciler = Arc::new(OperationReconciler::new(
        git.clone(),
        cache.clone(),
        store.clone(),
        ReconcileSettings {
            poll_interval: Duration::from_millis(1),
            max_attempts: 5,
        },
    ));

    let ascode = Arc::new(AsCodeOrchestrator::new(AsCodeDeps {
        workflows: store.clone(),
        entities: store.clone(),
        git,
        exporter: Arc::new(JsonWorkflowExporter::new(store.clone(), store.clone())),
        cache,
        reconciler,
        events: bus.clone(),
        runner: BackgroundRunner::new(4),
    }));

    let state = AppState {
        pool: None,
        config: Arc::new(config.clone()),
        workflows: store.clone(),
        entities: store.clone(),
        ascode: ascode.clone(),
        event_bus: bus.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        ascode,
        bus,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-actor-id", "3")
        .header("x-actor-name", "alice")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_empty(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-actor-id", "3")
        .header("x-actor-name", "alice")
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn application(id: DbId, project_id: DbId) -> Application {
    Application {
        id,
        project_id,
        name: format!("app-{id}"),
        description: None,
        vcs_server: "github".into(),
        repo_fullname: "org/app".into(),
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

pub fn workflow(id: DbId, project_key: &str, name: &str, app_id: DbId, pipeline_id: DbId) -> Workflow {
    let now = chrono::Utc::now();
    let context = NodeContext {
        application_id: app_id,
        pipeline_id,
        ..NodeContext::default()
    };
    Workflow {
        id,
        project_id: if project_key == "PROJ" { 1 } else { 2 },
        project_key: project_key.into(),
        name: name.into(),
        description: String::new(),
        icon: "data:image/png;base64,AAAA".into(),
        from_repository: String::new(),
        workflow_data: WorkflowData::new(Node::pipeline(id * 10, "build", context)),
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

/// Projects `PROJ` (id 1, group 10) and `OTHER` (id 2, group 20), with
/// workflows `w1`, `w2` in `PROJ` and `w3` in `OTHER`, all sharing
/// pipeline 42.
pub fn seed(store: &InMemoryStore) {
    store.insert_application(application(7, 1));
    store.insert_application(application(8, 2));
    store.insert_pipeline(pipeline(42, "build"));
    store.insert_workflow(workflow(1, "PROJ", "w1", 7, 42));
    store.insert_workflow(workflow(2, "PROJ", "w2", 7, 42));
    store.insert_workflow(workflow(3, "OTHER", "w3", 8, 42));
    store.set_project_groups(1, vec![10]);
    store.set_project_groups(2, vec![20]);
}
