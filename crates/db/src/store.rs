//! Store seams used by the loaders and the as-code orchestrator.
//!
//! [`EntityStore`] serves batched "load by key set" lookups, one call per
//! entity kind per batch. [`WorkflowStore`] serves the few workflow reads
//! and writes the sync flow needs. [`PgStore`] implements both on top of
//! the repositories; [`crate::memory::InMemoryStore`] implements them for
//! tests.

use async_trait::async_trait;
use conveyor_core::types::DbId;

use crate::models::application::Application;
use crate::models::ascode_event::{AsCodeEvent, NewAsCodeEvent};
use crate::models::environment::Environment;
use crate::models::integration::ProjectIntegration;
use crate::models::pipeline::Pipeline;
use crate::models::template::TemplateInstance;
use crate::models::workflow::{Workflow, WorkflowListQuery};
use crate::repositories::{
    ApplicationRepo, AsCodeEventRepo, EnvironmentRepo, IntegrationRepo, PipelineRepo,
    TemplateInstanceRepo, WorkflowRepo,
};
use crate::DbPool;

pub type StoreResult<T> = Result<T, sqlx::Error>;

/// Batched lookups of the entities workflows reference.
///
/// Every method takes the full key set of a batch. Keys without a matching
/// entity are absent from the result; callers decide whether that is fatal.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn load_applications(&self, ids: &[DbId]) -> StoreResult<Vec<Application>>;

    async fn load_environments(&self, ids: &[DbId]) -> StoreResult<Vec<Environment>>;

    async fn load_pipelines(&self, ids: &[DbId]) -> StoreResult<Vec<Pipeline>>;

    async fn load_integrations(&self, ids: &[DbId]) -> StoreResult<Vec<ProjectIntegration>>;

    async fn load_as_code_events_by_repositories(
        &self,
        repositories: &[String],
    ) -> StoreResult<Vec<AsCodeEvent>>;

    async fn load_as_code_events_by_workflow_ids(
        &self,
        workflow_ids: &[DbId],
    ) -> StoreResult<Vec<AsCodeEvent>>;

    async fn load_template_instances_by_workflow_ids(
        &self,
        workflow_ids: &[DbId],
    ) -> StoreResult<Vec<TemplateInstance>>;
}

/// Workflow reads and writes used by listing and synchronization.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Workflows matching `query`, without any reference resolved.
    async fn list_workflows(&self, query: &WorkflowListQuery) -> StoreResult<Vec<Workflow>>;

    async fn find_workflow(&self, project_key: &str, name: &str) -> StoreResult<Option<Workflow>>;

    async fn find_application(&self, id: DbId) -> StoreResult<Option<Application>>;

    /// Persist the workflow's tree and editable fields. Fails with
    /// `RowNotFound` when the workflow no longer exists.
    async fn update_workflow(&self, workflow: &Workflow) -> StoreResult<()>;

    async fn insert_as_code_event(&self, event: &NewAsCodeEvent) -> StoreResult<AsCodeEvent>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn load_applications(&self, ids: &[DbId]) -> StoreResult<Vec<Application>> {
        ApplicationRepo::list_by_ids(&self.pool, ids).await
    }

    async fn load_environments(&self, ids: &[DbId]) -> StoreResult<Vec<Environment>> {
        EnvironmentRepo::list_by_ids(&self.pool, ids).await
    }

    async fn load_pipelines(&self, ids: &[DbId]) -> StoreResult<Vec<Pipeline>> {
        PipelineRepo::list_by_ids(&self.pool, ids).await
    }

    async fn load_integrations(&self, ids: &[DbId]) -> StoreResult<Vec<ProjectIntegration>> {
        IntegrationRepo::list_by_ids(&self.pool, ids).await
    }

    async fn load_as_code_events_by_repositories(
        &self,
        repositories: &[String],
    ) -> StoreResult<Vec<AsCodeEvent>> {
        AsCodeEventRepo::list_by_repositories(&self.pool, repositories).await
    }

    async fn load_as_code_events_by_workflow_ids(
        &self,
        workflow_ids: &[DbId],
    ) -> StoreResult<Vec<AsCodeEvent>> {
        AsCodeEventRepo::list_by_entity_ids(
            &self.pool,
            conveyor_core::ascode::AsCodeEntityType::Workflow.as_str(),
            workflow_ids,
        )
        .await
    }

    async fn load_template_instances_by_workflow_ids(
        &self,
        workflow_ids: &[DbId],
    ) -> StoreResult<Vec<TemplateInstance>> {
        TemplateInstanceRepo::list_by_workflow_ids(&self.pool, workflow_ids).await
    }
}

#[async_trait]
impl WorkflowStore for PgStore {
    async fn list_workflows(&self, query: &WorkflowListQuery) -> StoreResult<Vec<Workflow>> {
        let rows = WorkflowRepo::list(&self.pool, query).await?;
        Ok(rows.into_iter().map(Workflow::from).collect())
    }

    async fn find_workflow(&self, project_key: &str, name: &str) -> StoreResult<Option<Workflow>> {
        let row = WorkflowRepo::find_by_name(&self.pool, project_key, name).await?;
        Ok(row.map(Workflow::from))
    }

    async fn find_application(&self, id: DbId) -> StoreResult<Option<Application>> {
        ApplicationRepo::find_by_id(&self.pool, id).await
    }

    async fn update_workflow(&self, workflow: &Workflow) -> StoreResult<()> {
        if WorkflowRepo::update(&self.pool, workflow).await? {
            Ok(())
        } else {
            Err(sqlx::Error::RowNotFound)
        }
    }

    async fn insert_as_code_event(&self, event: &NewAsCodeEvent) -> StoreResult<AsCodeEvent> {
        AsCodeEventRepo::create(&self.pool, event).await
    }
}
