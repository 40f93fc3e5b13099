//! Project integration entity model.

use conveyor_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `project_integrations` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ProjectIntegration {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    /// Integration model name, e.g. `"Kafka"` or `"Openstack"`.
    pub model: String,
    pub config: Json<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
