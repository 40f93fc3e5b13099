//! As-code rules (hooks, preconditions, sync states).
//!
//! A workflow is "as code" once it is linked to a repository
//! (`from_repository` set) or once a synchronization with a repository has
//! produced an as-code event. The functions here decide whether a
//! migrate or update may start; the orchestration itself lives in the
//! `conveyor-ascode` crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::workflow::{NodeHook, WorkflowData};

// ---------------------------------------------------------------------------
// Repository webhook
// ---------------------------------------------------------------------------

/// Hook model that makes the repository notify the platform on push.
pub const REPOSITORY_WEBHOOK_MODEL_NAME: &str = "RepositoryWebHook";

/// Configuration keys of the repository webhook model.
pub mod webhook_config {
    pub const EVENT_FILTER: &str = "eventFilter";
    pub const VCS_SERVER: &str = "vcsServer";
    pub const REPO_FULL_NAME: &str = "repoFullName";
}

/// Default configuration injected with a new repository webhook.
///
/// VCS server and repository are left empty; they are filled from the root
/// application when the hook is registered.
pub fn repository_webhook_default_config() -> BTreeMap<String, String> {
    BTreeMap::from([
        (webhook_config::EVENT_FILTER.to_string(), "push".to_string()),
        (webhook_config::VCS_SERVER.to_string(), String::new()),
        (webhook_config::REPO_FULL_NAME.to_string(), String::new()),
    ])
}

/// Whether any node of the tree already carries a repository webhook.
pub fn has_repository_webhook(data: &WorkflowData) -> bool {
    data.nodes()
        .iter()
        .flat_map(|n| n.hooks.iter())
        .any(|h| h.hook_model_name == REPOSITORY_WEBHOOK_MODEL_NAME)
}

/// Add a repository webhook on the root node unless one exists.
///
/// Returns `true` when the tree was modified and must be persisted.
pub fn ensure_repository_webhook(data: &mut WorkflowData) -> bool {
    if has_repository_webhook(data) {
        return false;
    }
    data.node.hooks.push(NodeHook {
        hook_model_name: REPOSITORY_WEBHOOK_MODEL_NAME.to_string(),
        config: repository_webhook_default_config(),
    });
    true
}

// ---------------------------------------------------------------------------
// Entity type tag
// ---------------------------------------------------------------------------

/// Kind of entity an as-code event is about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsCodeEntityType {
    #[default]
    Workflow,
}

impl AsCodeEntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
        }
    }
}

// ---------------------------------------------------------------------------
// Preconditions
// ---------------------------------------------------------------------------

/// A workflow may be migrated only if nothing marks it as code yet.
pub fn ensure_migratable(from_repository: &str, as_code_event_count: usize) -> Result<(), CoreError> {
    if !from_repository.is_empty() {
        return Err(CoreError::AlreadyAsCode(format!(
            "workflow is linked to repository {from_repository}"
        )));
    }
    if as_code_event_count > 0 {
        return Err(CoreError::AlreadyAsCode(format!(
            "workflow has {as_code_event_count} pending as-code event(s)"
        )));
    }
    Ok(())
}

/// A workflow may be updated through its repository only if it is as code
/// and was not generated by a template.
pub fn ensure_updatable(from_repository: &str, from_template: bool) -> Result<(), CoreError> {
    if from_repository.is_empty() {
        return Err(CoreError::Forbidden(
            "cannot update a workflow that is not ascode".into(),
        ));
    }
    if from_template {
        return Err(CoreError::Forbidden(
            "cannot update a workflow that was generated by a template".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sync state machine
// ---------------------------------------------------------------------------

/// Per-workflow synchronization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    NotAsCode,
    OperationPending,
    Reconciling,
    AsCode,
    Failed,
}

impl SyncState {
    /// Starting state derived from the stored workflow.
    pub fn of(from_repository: &str, as_code_event_count: usize) -> Self {
        if from_repository.is_empty() && as_code_event_count == 0 {
            Self::NotAsCode
        } else {
            Self::AsCode
        }
    }

    pub fn can_transition_to(self, next: SyncState) -> bool {
        use SyncState::*;
        matches!(
            (self, next),
            (NotAsCode, OperationPending)
                | (AsCode, OperationPending)
                | (OperationPending, Reconciling)
                | (Reconciling, AsCode)
                | (Reconciling, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAsCode => "not_as_code",
            Self::OperationPending => "operation_pending",
            Self::Reconciling => "reconciling",
            Self::AsCode => "as_code",
            Self::Failed => "failed",
        }
    }
}
