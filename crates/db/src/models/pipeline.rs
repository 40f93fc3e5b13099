//! Pipeline entity model.

use conveyor_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A pipeline row from the `pipelines` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Pipeline {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
