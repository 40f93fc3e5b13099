//! Environment entity model.

use conveyor_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// An environment row from the `environments` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Environment {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
