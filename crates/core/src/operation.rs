//! Repository push operations.
//!
//! An [`Operation`] is the handle of an asynchronous git job run by the
//! external repositories service. The platform creates it, hands it to the
//! service, and polls the service until the job reaches a terminal status.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// Lifecycle of an operation as reported by the repositories service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    #[default]
    Pending,
    Processing,
    Done,
    Error,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// How the repositories service authenticates against the VCS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStrategy {
    /// `https` or `ssh`.
    #[serde(default)]
    pub connection_type: String,
    #[serde(default)]
    pub ssh_key: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub default_branch: String,
}

/// Pull request opened by a push, when the service created one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub id: i64,
    pub url: String,
}

/// A push/pull job tracked by UUID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub uuid: Uuid,
    pub vcs_server: String,
    pub repo_fullname: String,
    /// Clone URL of the repository, filled by the service.
    #[serde(default)]
    pub url: String,
    pub branch: String,
    pub message: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Only sent to the repositories service, never serialized with the
    /// operation itself.
    #[serde(default, skip_serializing)]
    pub strategy: RepositoryStrategy,
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestInfo>,
    pub date: Timestamp,
}

impl Operation {
    /// A fresh pending operation with a newly generated UUID.
    pub fn new_push(
        vcs_server: impl Into<String>,
        repo_fullname: impl Into<String>,
        branch: impl Into<String>,
        message: impl Into<String>,
        strategy: RepositoryStrategy,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            vcs_server: vcs_server.into(),
            repo_fullname: repo_fullname.into(),
            url: String::new(),
            branch: branch.into(),
            message: message.into(),
            payload,
            strategy,
            status: OperationStatus::Pending,
            error: None,
            pull_request: None,
            date: chrono::Utc::now(),
        }
    }

    /// The operation with its repository credentials cleared, as kept in
    /// the cache and handed back to callers.
    pub fn without_credentials(mut self) -> Self {
        self.strategy = RepositoryStrategy::default();
        self
    }

    /// Repository identifier recorded on events: the clone URL when the
    /// service reported one, else the full name.
    pub fn repository(&self) -> &str {
        if self.url.is_empty() {
            &self.repo_fullname
        } else {
            &self.url
        }
    }
}
