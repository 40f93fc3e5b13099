//! Application entity model.

use conveyor_core::operation::RepositoryStrategy;
use conveyor_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// An application row from the `applications` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Application {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub description: Option<String>,
    /// Empty when no repository is attached.
    pub vcs_server: String,
    pub repo_fullname: String,
    /// Credentials stay server-side.
    #[serde(skip_serializing)]
    pub repository_strategy: Json<RepositoryStrategy>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Application {
    /// Whether the application is linked to a VCS repository.
    pub fn has_vcs(&self) -> bool {
        !self.vcs_server.is_empty() && !self.repo_fullname.is_empty()
    }
}
