//! In-memory store.
//!
//! Implements [`EntityStore`] and [`WorkflowStore`] over plain maps so the
//! loaders, the orchestrator and the HTTP layer can be exercised without a
//! database. Every batched fetch is recorded so callers can check how many
//! round-trips a pass issued.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use conveyor_core::types::DbId;

use crate::models::application::Application;
use crate::models::ascode_event::{AsCodeEvent, NewAsCodeEvent};
use crate::models::environment::Environment;
use crate::models::integration::ProjectIntegration;
use crate::models::pipeline::Pipeline;
use crate::models::template::TemplateInstance;
use crate::models::workflow::{Workflow, WorkflowListQuery};
use crate::store::{EntityStore, StoreResult, WorkflowStore};

/// Names under which fetches are recorded.
pub mod fetch_kinds {
    pub const APPLICATIONS: &str = "applications";
    pub const ENVIRONMENTS: &str = "environments";
    pub const PIPELINES: &str = "pipelines";
    pub const INTEGRATIONS: &str = "integrations";
    pub const EVENTS_BY_REPOSITORY: &str = "as_code_events_by_repository";
    pub const EVENTS_BY_WORKFLOW: &str = "as_code_events_by_workflow";
    pub const TEMPLATE_INSTANCES: &str = "template_instances";
}

#[derive(Default)]
struct Tables {
    applications: BTreeMap<DbId, Application>,
    environments: BTreeMap<DbId, Environment>,
    pipelines: BTreeMap<DbId, Pipeline>,
    integrations: BTreeMap<DbId, ProjectIntegration>,
    workflows: BTreeMap<DbId, Workflow>,
    template_instances: Vec<TemplateInstance>,
    as_code_events: Vec<AsCodeEvent>,
    project_groups: HashMap<DbId, Vec<DbId>>,
}

/// Map-backed store with fetch recording.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    fetches: Mutex<Vec<(&'static str, Vec<String>)>>,
    next_event_id: AtomicI64,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_application(&self, application: Application) {
        self.write().applications.insert(application.id, application);
    }

    pub fn insert_environment(&self, environment: Environment) {
        self.write().environments.insert(environment.id, environment);
    }

    pub fn insert_pipeline(&self, pipeline: Pipeline) {
        self.write().pipelines.insert(pipeline.id, pipeline);
    }

    pub fn remove_pipeline(&self, id: DbId) {
        self.write().pipelines.remove(&id);
    }

    pub fn insert_integration(&self, integration: ProjectIntegration) {
        self.write().integrations.insert(integration.id, integration);
    }

    pub fn insert_workflow(&self, workflow: Workflow) {
        self.write().workflows.insert(workflow.id, workflow);
    }

    pub fn insert_template_instance(&self, instance: TemplateInstance) {
        self.write().template_instances.push(instance);
    }

    pub fn insert_as_code_event(&self, event: AsCodeEvent) {
        self.write().as_code_events.push(event);
    }

    pub fn set_project_groups(&self, project_id: DbId, group_ids: Vec<DbId>) {
        self.write().project_groups.insert(project_id, group_ids);
    }

    /// Make every subsequent write fail with a pool timeout.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stored copy of a workflow.
    pub fn workflow(&self, id: DbId) -> Option<Workflow> {
        self.read().workflows.get(&id).cloned()
    }

    /// All recorded as-code events.
    pub fn as_code_events(&self) -> Vec<AsCodeEvent> {
        self.read().as_code_events.clone()
    }

    /// Key sets of every fetch issued for `kind`, in call order.
    pub fn fetches(&self, kind: &str) -> Vec<Vec<String>> {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, keys)| keys.clone())
            .collect()
    }

    fn record<K: ToString>(&self, kind: &'static str, keys: &[K]) {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, keys.iter().map(ToString::to_string).collect()));
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }
}

fn pick<T: Clone>(table: &BTreeMap<DbId, T>, ids: &[DbId]) -> Vec<T> {
    ids.iter().filter_map(|id| table.get(id).cloned()).collect()
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn load_applications(&self, ids: &[DbId]) -> StoreResult<Vec<Application>> {
        self.record(fetch_kinds::APPLICATIONS, ids);
        Ok(pick(&self.read().applications, ids))
    }

    async fn load_environments(&self, ids: &[DbId]) -> StoreResult<Vec<Environment>> {
        self.record(fetch_kinds::ENVIRONMENTS, ids);
        Ok(pick(&self.read().environments, ids))
    }

    async fn load_pipelines(&self, ids: &[DbId]) -> StoreResult<Vec<Pipeline>> {
        self.record(fetch_kinds::PIPELINES, ids);
        Ok(pick(&self.read().pipelines, ids))
    }

    async fn load_integrations(&self, ids: &[DbId]) -> StoreResult<Vec<ProjectIntegration>> {
        self.record(fetch_kinds::INTEGRATIONS, ids);
        Ok(pick(&self.read().integrations, ids))
    }

    async fn load_as_code_events_by_repositories(
        &self,
        repositories: &[String],
    ) -> StoreResult<Vec<AsCodeEvent>> {
        self.record(fetch_kinds::EVENTS_BY_REPOSITORY, repositories);
        Ok(self
            .read()
            .as_code_events
            .iter()
            .filter(|e| repositories.contains(&e.from_repo))
            .cloned()
            .collect())
    }

    async fn load_as_code_events_by_workflow_ids(
        &self,
        workflow_ids: &[DbId],
    ) -> StoreResult<Vec<AsCodeEvent>> {
        self.record(fetch_kinds::EVENTS_BY_WORKFLOW, workflow_ids);
        let workflow_tag = conveyor_core::ascode::AsCodeEntityType::Workflow.as_str();
        Ok(self
            .read()
            .as_code_events
            .iter()
            .filter(|e| e.entity_type == workflow_tag && workflow_ids.contains(&e.entity_id))
            .cloned()
            .collect())
    }

    async fn load_template_instances_by_workflow_ids(
        &self,
        workflow_ids: &[DbId],
    ) -> StoreResult<Vec<TemplateInstance>> {
        self.record(fetch_kinds::TEMPLATE_INSTANCES, workflow_ids);
        Ok(self
            .read()
            .template_instances
            .iter()
            .filter(|i| i.workflow_id.is_some_and(|id| workflow_ids.contains(&id)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn list_workflows(&self, query: &WorkflowListQuery) -> StoreResult<Vec<Workflow>> {
        let tables = self.read();
        let f = &query.filters;
        let matches = |expected: &Option<String>, actual: &str| {
            expected
                .as_deref()
                .filter(|e| !e.is_empty())
                .map_or(true, |e| e == actual)
        };

        let mut selected: Vec<Workflow> = tables
            .workflows
            .values()
            .filter(|w| {
                let root_app = w
                    .workflow_data
                    .root_application_id()
                    .and_then(|id| tables.applications.get(&id));
                let vcs_server = root_app.map(|a| a.vcs_server.as_str()).unwrap_or("");
                let repository = root_app.map(|a| a.repo_fullname.as_str()).unwrap_or("");
                let groups_visible = f.group_ids.is_empty()
                    || tables
                        .project_groups
                        .get(&w.project_id)
                        .is_some_and(|groups| groups.iter().any(|g| f.group_ids.contains(g)));

                matches(&f.project_key, &w.project_key)
                    && matches(&f.workflow_name, &w.name)
                    && matches(&f.vcs_server, vcs_server)
                    && matches(&f.repository, repository)
                    && groups_visible
            })
            .cloned()
            .collect();

        selected.sort_by(|a, b| {
            a.project_key.cmp(&b.project_key).then_with(|| {
                if query.ascending {
                    a.name.cmp(&b.name)
                } else {
                    b.name.cmp(&a.name)
                }
            })
        });

        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).ok().filter(|l| *l > 0);
        let page = selected.into_iter().skip(offset);
        Ok(match limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        })
    }

    async fn find_workflow(&self, project_key: &str, name: &str) -> StoreResult<Option<Workflow>> {
        Ok(self
            .read()
            .workflows
            .values()
            .find(|w| w.project_key == project_key && w.name == name)
            .cloned())
    }

    async fn find_application(&self, id: DbId) -> StoreResult<Option<Application>> {
        Ok(self.read().applications.get(&id).cloned())
    }

    async fn update_workflow(&self, workflow: &Workflow) -> StoreResult<()> {
        self.check_writable()?;
        let mut tables = self.write();
        let stored = tables
            .workflows
            .get_mut(&workflow.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        stored.name = workflow.name.clone();
        stored.description = workflow.description.clone();
        stored.icon = workflow.icon.clone();
        stored.workflow_data = workflow.workflow_data.clone();
        stored.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn insert_as_code_event(&self, event: &NewAsCodeEvent) -> StoreResult<AsCodeEvent> {
        self.check_writable()?;
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = AsCodeEvent {
            id,
            entity_type: event.entity_type.as_str().to_string(),
            from_repo: event.from_repo.clone(),
            operation_uuid: event.operation_uuid,
            entity_id: event.entity_id,
            entity_name: event.entity_name.clone(),
            outcome: event.outcome.clone(),
            pull_request_id: event.pull_request_id,
            pull_request_url: event.pull_request_url.clone(),
            username: event.username.clone(),
            created_at: chrono::Utc::now(),
        };
        self.write().as_code_events.push(created.clone());
        Ok(created)
    }
}
