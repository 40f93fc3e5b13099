//! As-code event model and DTO.

use conveyor_core::ascode::AsCodeEntityType;
use conveyor_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Outcome values stored in `as_code_events.outcome`.
pub mod outcomes {
    /// The push opened a pull request on the repository.
    pub const PULL_REQUEST_CREATED: &str = "pull_request_created";
    /// The push landed directly on the branch.
    pub const PUSHED: &str = "pushed";
}

/// A row from the `as_code_events` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AsCodeEvent {
    pub id: DbId,
    /// Entity type tag, see [`AsCodeEntityType`].
    pub entity_type: String,
    pub from_repo: String,
    pub operation_uuid: Uuid,
    pub entity_id: DbId,
    pub entity_name: String,
    pub outcome: String,
    pub pull_request_id: Option<i64>,
    pub pull_request_url: Option<String>,
    pub username: String,
    pub created_at: Timestamp,
}

/// DTO for recording a new as-code event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewAsCodeEvent {
    pub entity_type: AsCodeEntityType,
    pub from_repo: String,
    pub operation_uuid: Uuid,
    pub entity_id: DbId,
    pub entity_name: String,
    pub outcome: String,
    pub pull_request_id: Option<i64>,
    pub pull_request_url: Option<String>,
    pub username: String,
}
