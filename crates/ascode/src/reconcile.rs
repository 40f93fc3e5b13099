//! Reconciliation of pushed operations.
//!
//! Once a push is accepted, a detached task follows the operation until the
//! repositories service reports a terminal status, then records the result
//! as an as-code event.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conveyor_core::ascode::AsCodeEntityType;
use conveyor_core::operation::{Operation, OperationStatus};
use conveyor_core::types::{Actor, DbId};
use conveyor_db::models::application::Application;
use conveyor_db::models::ascode_event::{outcomes, AsCodeEvent, NewAsCodeEvent};
use conveyor_db::store::WorkflowStore;
use serde::Serialize;
use uuid::Uuid;

use crate::cache::OperationCache;
use crate::error::SyncResult;
use crate::git::GitOperationService;

/// The entity a reconciliation is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityData {
    pub name: String,
    pub id: DbId,
    pub entity_type: AsCodeEntityType,
    /// Repository recorded on the resulting event.
    pub from_repo: String,
    pub operation_uuid: Uuid,
}

#[async_trait]
pub trait ReconciliationCollaborator: Send + Sync {
    /// Follow the operation named by `entity` to completion.
    ///
    /// Returns the recorded event, or `None` when the operation ended
    /// without producing one.
    async fn update_as_code_result(
        &self,
        project_key: &str,
        application: &Application,
        entity: EntityData,
        actor: &Actor,
    ) -> SyncResult<Option<AsCodeEvent>>;
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcileSettings {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 60,
        }
    }
}

/// Polls the repositories service and records the outcome.
pub struct OperationReconciler {
    git: Arc<dyn GitOperationService>,
    cache: Arc<dyn OperationCache>,
    store: Arc<dyn WorkflowStore>,
    settings: ReconcileSettings,
}

impl OperationReconciler {
    pub fn new(
        git: Arc<dyn GitOperationService>,
        cache: Arc<dyn OperationCache>,
        store: Arc<dyn WorkflowStore>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            git,
            cache,
            store,
            settings,
        }
    }

    /// Poll until the operation is terminal or attempts run out. Every
    /// observed state is written to the cache.
    async fn poll(&self, uuid: Uuid) -> SyncResult<Option<Operation>> {
        for attempt in 1..=self.settings.max_attempts {
            let operation = self.git.fetch_operation(uuid).await?.without_credentials();
            self.cache.set(operation.clone()).await;

            if operation.status.is_terminal() {
                return Ok(Some(operation));
            }
            tracing::trace!(operation_uuid = %uuid, attempt, status = ?operation.status, "Operation still running");
            tokio::time::sleep(self.settings.poll_interval).await;
        }
        Ok(None)
    }
}

#[async_trait]
impl ReconciliationCollaborator for OperationReconciler {
    async fn update_as_code_result(
        &self,
        project_key: &str,
        application: &Application,
        entity: EntityData,
        actor: &Actor,
    ) -> SyncResult<Option<AsCodeEvent>> {
        let Some(operation) = self.poll(entity.operation_uuid).await? else {
            tracing::warn!(
                operation_uuid = %entity.operation_uuid,
                project_key,
                attempts = self.settings.max_attempts,
                "Operation did not complete in time"
            );
            return Ok(None);
        };

        if operation.status == OperationStatus::Error {
            tracing::warn!(
                operation_uuid = %operation.uuid,
                project_key,
                application = %application.name,
                error = operation.error.as_deref().unwrap_or(""),
                "Repository operation failed"
            );
            return Ok(None);
        }

        let outcome = if operation.pull_request.is_some() {
            outcomes::PULL_REQUEST_CREATED
        } else {
            outcomes::PUSHED
        };
        let new_event = NewAsCodeEvent {
            entity_type: entity.entity_type,
            from_repo: entity.from_repo,
            operation_uuid: operation.uuid,
            entity_id: entity.id,
            entity_name: entity.name,
            outcome: outcome.to_string(),
            pull_request_id: operation.pull_request.as_ref().map(|pr| pr.id),
            pull_request_url: operation.pull_request.as_ref().map(|pr| pr.url.clone()),
            username: actor.username.clone(),
        };
        let event = self.store.insert_as_code_event(&new_event).await?;

        tracing::info!(
            operation_uuid = %operation.uuid,
            project_key,
            entity_id = event.entity_id,
            outcome,
            "Recorded as-code event"
        );
        Ok(Some(event))
    }
}
