mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use conveyor_ascode::{
    EntityData, ReconciliationCollaborator, SyncError, SyncRequest, SyncResult, WorkflowUpdate,
};
use conveyor_core::ascode::{has_repository_webhook, REPOSITORY_WEBHOOK_MODEL_NAME};
use conveyor_core::error::CoreError;
use conveyor_core::operation::{OperationStatus, PullRequestInfo, RepositoryStrategy};
use conveyor_core::types::Actor;
use conveyor_core::workflow::{Node, NodeContext, NodeHook, WorkflowData};
use conveyor_db::models::application::Application;
use conveyor_db::models::ascode_event::{outcomes, AsCodeEvent};
use sqlx::types::Json;
use conveyor_events::event_types;
use tokio::sync::Notify;

use common::*;

fn actor() -> Actor {
    Actor::new(5, "alice")
}

fn request() -> SyncRequest {
    SyncRequest {
        branch: "as-code".into(),
        message: "Enable as code".into(),
    }
}

fn pull_request() -> Option<PullRequestInfo> {
    Some(PullRequestInfo {
        id: 12,
        url: "https://github.com/org/app/pull/12".into(),
    })
}

fn as_code_workflow_update() -> WorkflowUpdate {
    WorkflowUpdate {
        name: "w1".into(),
        description: "updated".into(),
        workflow_data: WorkflowData::new(
            Node::pipeline(10, "", root_context(7, 42))
                .with_child(Node::pipeline(11, "", NodeContext { pipeline_id: 42, ..NodeContext::default() })),
        ),
    }
}

fn make_as_code(h: &Harness) {
    let mut w = h.store.workflow(1).unwrap();
    w.from_repository = REPO_URL.into();
    h.store.insert_workflow(w);
}

// ---------------------------------------------------------------------------
// Migrate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn migrate_pushes_and_publishes_the_outcome() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, pull_request()));
    seed_w1(&h.store, true);
    let mut rx = h.bus.subscribe();

    let operation = h
        .orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .unwrap();

    assert_eq!(operation.status, OperationStatus::Pending);
    assert_eq!(operation.repo_fullname, "org/app");
    assert_eq!(operation.branch, "as-code");
    assert_eq!(operation.payload["name"], "w1");

    let stored = h.store.workflow(1).unwrap();
    assert!(has_repository_webhook(&stored.workflow_data));

    h.settle().await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, event_types::AS_CODE_EVENT);
    assert_eq!(event.project_key, "PROJ");
    assert_eq!(event.actor_username.as_deref(), Some("alice"));
    assert_eq!(event.payload["outcome"], outcomes::PULL_REQUEST_CREATED);

    let recorded = h.store.as_code_events();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].from_repo, REPO_URL);
    assert_eq!(recorded[0].operation_uuid, operation.uuid);
    assert_eq!(recorded[0].pull_request_id, Some(12));

    let status = h.orchestrator.sync_status(operation.uuid).await.unwrap();
    assert_eq!(status.status, OperationStatus::Done);
    assert!(h.orchestrator.in_flight(1).is_none());
}

#[tokio::test]
async fn migrate_without_pull_request_records_a_push() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    seed_w1(&h.store, true);

    h.orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .unwrap();
    h.settle().await;

    assert_eq!(h.store.as_code_events()[0].outcome, outcomes::PUSHED);
}

#[tokio::test]
async fn migrate_rejects_workflow_linked_to_a_repository() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    seed_w1(&h.store, true);
    make_as_code(&h);

    let err = h
        .orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .unwrap_err();

    assert_matches!(err, SyncError::Core(CoreError::AlreadyAsCode(_)));
    assert!(h.git.pushed().is_empty());
}

#[tokio::test]
async fn migrate_rejects_workflow_with_pending_events() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    seed_w1(&h.store, true);
    h.store.insert_as_code_event(AsCodeEvent {
        id: 1,
        entity_type: "workflow".into(),
        from_repo: String::new(),
        operation_uuid: uuid::Uuid::new_v4(),
        entity_id: 1,
        entity_name: "w1".into(),
        outcome: outcomes::PULL_REQUEST_CREATED.into(),
        pull_request_id: Some(3),
        pull_request_url: None,
        username: "bob".into(),
        created_at: chrono::Utc::now(),
    });

    let err = h
        .orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .unwrap_err();

    assert_matches!(err, SyncError::Core(CoreError::AlreadyAsCode(_)));
    assert!(!has_repository_webhook(&h.store.workflow(1).unwrap().workflow_data));
}

#[tokio::test]
async fn migrate_requires_vcs_on_root_application() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    seed_w1(&h.store, false);

    let err = h
        .orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .unwrap_err();

    assert_matches!(err, SyncError::Core(CoreError::InvalidRequest(_)));
    assert!(h.orchestrator.in_flight(1).is_none());
}

#[tokio::test]
async fn migrate_requires_a_root_application() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    h.store.insert_pipeline(pipeline(42, "build"));
    // No application on the root node.
    h.store.insert_workflow(workflow(
        1,
        "w1",
        WorkflowData::new(Node::pipeline(10, "build", root_context(0, 42))),
    ));
    // Root node points at an application that does not exist.
    h.store.insert_workflow(workflow(
        2,
        "w2",
        WorkflowData::new(Node::pipeline(20, "build", root_context(99, 42))),
    ));

    for name in ["w1", "w2"] {
        let err = h
            .orchestrator
            .request_migrate("PROJ", name, request(), &actor())
            .await
            .unwrap_err();
        assert_matches!(err, SyncError::Core(CoreError::InvalidRequest(_)));
    }
    assert!(h.git.pushed().is_empty());
    assert!(h.orchestrator.in_flight(1).is_none());
    assert!(h.orchestrator.in_flight(2).is_none());
}

#[tokio::test]
async fn migrate_keeps_repository_credentials_private() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    seed_w1(&h.store, true);
    let mut app = application(7, true);
    app.repository_strategy = Json(RepositoryStrategy {
        connection_type: "ssh".into(),
        ssh_key: "PRIVATE-KEY".into(),
        user: "deploy".into(),
        default_branch: "main".into(),
    });
    h.store.insert_application(app);

    let operation = h
        .orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .unwrap();
    h.settle().await;

    // The repositories service still receives the credentials.
    assert_eq!(h.git.pushed()[0].strategy.ssh_key, "PRIVATE-KEY");

    assert_eq!(operation.strategy, RepositoryStrategy::default());
    assert!(!serde_json::to_string(&operation).unwrap().contains("PRIVATE-KEY"));

    let status = h.orchestrator.sync_status(operation.uuid).await.unwrap();
    assert_eq!(status.status, OperationStatus::Done);
    assert_eq!(status.strategy, RepositoryStrategy::default());
    assert!(!serde_json::to_string(&status).unwrap().contains("PRIVATE-KEY"));
}

#[tokio::test]
async fn migrate_unknown_workflow_is_not_found() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));

    let err = h
        .orchestrator
        .request_migrate("PROJ", "missing", request(), &actor())
        .await
        .unwrap_err();

    assert_matches!(err, SyncError::Core(CoreError::NotFound { entity: "workflow", .. }));
}

#[tokio::test]
async fn existing_repository_webhook_is_not_added_twice() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    h.store.insert_application(application(7, true));
    h.store.insert_pipeline(pipeline(42, "build"));
    h.store.insert_workflow(workflow(
        1,
        "w1",
        WorkflowData::new(Node::pipeline(10, "build", root_context(7, 42)).with_hook(NodeHook {
            hook_model_name: REPOSITORY_WEBHOOK_MODEL_NAME.into(),
            config: Default::default(),
        })),
    ));
    // Any write would fail: the tree must be left alone.
    h.store.fail_writes(true);

    h.orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .unwrap();

    let hooks = h.store.workflow(1).unwrap().workflow_data.node.hooks;
    assert_eq!(hooks.len(), 1);
}

#[tokio::test]
async fn concurrent_sync_of_same_workflow_conflicts() {
    let hold = Arc::new(Notify::new());
    let mut git = FakeGitService::completing(OperationStatus::Done, None);
    git.hold = Some(hold.clone());
    let h = Harness::new(git);
    seed_w1(&h.store, true);

    let first = h
        .orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .unwrap();
    assert_eq!(h.orchestrator.in_flight(1).unwrap().operation_uuid, Some(first.uuid));

    let err = h
        .orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .unwrap_err();
    assert_matches!(err, SyncError::Core(CoreError::Conflict(_)));

    hold.notify_one();
    h.settle().await;
    assert!(h.orchestrator.in_flight(1).is_none());
}

#[tokio::test]
async fn sync_slot_covers_the_migration_preconditions() {
    let (h, gate) = Harness::with_event_gate(FakeGitService::completing(OperationStatus::Done, None));
    seed_w1(&h.store, true);

    // `first` stops right after reading the workflow's events; `second`
    // runs while it is parked, then lets it continue.
    let first_actor = actor();
    let first = h.orchestrator.request_migrate("PROJ", "w1", request(), &first_actor);
    let second = async {
        gate.parked.notified().await;
        let result = h
            .orchestrator
            .request_migrate("PROJ", "w1", request(), &actor())
            .await;
        gate.release.notify_one();
        result
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert_matches!(second, Err(SyncError::Core(CoreError::Conflict(_))));

    h.settle().await;
    assert_eq!(h.git.pushed().len(), 1);
    assert_eq!(h.store.as_code_events().len(), 1);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_of_template_owned_workflow_is_forbidden() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    seed_w1(&h.store, true);
    make_as_code(&h);
    h.store.insert_template_instance(conveyor_db::models::template::TemplateInstance {
        id: 1,
        workflow_template_id: 2,
        workflow_id: Some(1),
        workflow_template_version: 1,
        template_group_name: "shared".into(),
        template_slug: "deploy".into(),
        template_version: 1,
        created_at: chrono::Utc::now(),
    });

    let err = h
        .orchestrator
        .request_update("PROJ", "w1", as_code_workflow_update(), request(), &actor())
        .await
        .unwrap_err();

    assert_matches!(err, SyncError::Core(CoreError::Forbidden(_)));
    assert!(h.git.pushed().is_empty());
}

#[tokio::test]
async fn update_of_workflow_not_as_code_is_forbidden() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    seed_w1(&h.store, true);

    let err = h
        .orchestrator
        .request_update("PROJ", "w1", as_code_workflow_update(), request(), &actor())
        .await
        .unwrap_err();

    assert_matches!(err, SyncError::Core(CoreError::Forbidden(_)));
}

#[tokio::test]
async fn update_requires_a_root_application() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    h.store.insert_pipeline(pipeline(42, "build"));
    for (id, name, app_id) in [(1, "w1", 0), (2, "w2", 99)] {
        let mut w = workflow(
            id,
            name,
            WorkflowData::new(Node::pipeline(id * 10, "build", root_context(app_id, 42))),
        );
        w.from_repository = REPO_URL.into();
        h.store.insert_workflow(w);
    }

    for name in ["w1", "w2"] {
        let mut update = as_code_workflow_update();
        update.name = name.into();
        let err = h
            .orchestrator
            .request_update("PROJ", name, update, request(), &actor())
            .await
            .unwrap_err();
        assert_matches!(err, SyncError::Core(CoreError::InvalidRequest(_)));
    }
    assert!(h.git.pushed().is_empty());
}

#[tokio::test]
async fn update_normalizes_names_and_pushes_the_body() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, pull_request()));
    seed_w1(&h.store, true);
    make_as_code(&h);

    let operation = h
        .orchestrator
        .request_update("PROJ", "w1", as_code_workflow_update(), request(), &actor())
        .await
        .unwrap();

    let node = &operation.payload["workflow"]["node"];
    assert_eq!(node["name"], "build");
    assert_eq!(node["triggers"][0]["child_node"]["name"], "build_1");
    assert_eq!(operation.payload["description"], "updated");

    h.settle().await;
    let recorded = h.store.as_code_events();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].from_repo, REPO_URL);
    // The body is pushed, not stored.
    assert!(h.store.workflow(1).unwrap().description.is_empty());
}

#[tokio::test]
async fn update_with_unknown_pipeline_fails_validation() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    seed_w1(&h.store, true);
    make_as_code(&h);
    let mut update = as_code_workflow_update();
    update.workflow_data.node.context = Some(root_context(7, 99));

    let err = h
        .orchestrator
        .request_update("PROJ", "w1", update, request(), &actor())
        .await
        .unwrap_err();

    assert_matches!(err, SyncError::Core(CoreError::Validation(_)));
    assert!(h.orchestrator.in_flight(1).is_none());
}

#[tokio::test]
async fn update_with_invalid_name_fails_validation() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    seed_w1(&h.store, true);
    make_as_code(&h);
    let mut update = as_code_workflow_update();
    update.name = "not a name".into();

    let err = h
        .orchestrator
        .request_update("PROJ", "w1", update, request(), &actor())
        .await
        .unwrap_err();

    assert_matches!(err, SyncError::Core(CoreError::Validation(_)));
}

#[tokio::test]
async fn failed_background_operation_never_surfaces() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Error, None));
    seed_w1(&h.store, true);
    make_as_code(&h);
    let mut rx = h.bus.subscribe();

    let operation = h
        .orchestrator
        .request_update("PROJ", "w1", as_code_workflow_update(), request(), &actor())
        .await
        .unwrap();
    h.settle().await;

    assert!(h.store.as_code_events().is_empty());
    assert!(rx.try_recv().is_err());
    let status = h.orchestrator.sync_status(operation.uuid).await.unwrap();
    assert_eq!(status.status, OperationStatus::Error);
    assert!(h.orchestrator.in_flight(1).is_none());
}

// ---------------------------------------------------------------------------
// Background containment
// ---------------------------------------------------------------------------

struct PanickingReconciler;

#[async_trait]
impl ReconciliationCollaborator for PanickingReconciler {
    async fn update_as_code_result(
        &self,
        _project_key: &str,
        _application: &Application,
        _entity: EntityData,
        _actor: &Actor,
    ) -> SyncResult<Option<AsCodeEvent>> {
        panic!("reconciliation blew up");
    }
}

#[tokio::test]
async fn panicking_reconciliation_is_contained() {
    let h = Harness::with_reconciler(
        FakeGitService::completing(OperationStatus::Done, None),
        Arc::new(PanickingReconciler),
    );
    seed_w1(&h.store, true);

    h.orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .unwrap();
    h.settle().await;

    assert!(h.orchestrator.in_flight(1).is_none());
    // The slot was released: a retry gets past the registry.
    assert!(h
        .orchestrator
        .request_migrate("PROJ", "w1", request(), &actor())
        .await
        .is_ok());
}

#[tokio::test]
async fn unknown_operation_status_is_not_found() {
    let h = Harness::new(FakeGitService::completing(OperationStatus::Done, None));
    let err = h
        .orchestrator
        .sync_status(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, SyncError::Core(CoreError::NotFound { entity: "operation", .. }));
}
