//! Repository for the `applications` table.

use conveyor_core::types::DbId;
use sqlx::PgPool;

use crate::models::application::Application;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, name, description, vcs_server, repo_fullname, \
    repository_strategy, created_at, updated_at";

/// Read access to applications.
pub struct ApplicationRepo;

impl ApplicationRepo {
    /// Find an application by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Application>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM applications WHERE id = $1");
        sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load every application whose id is in `ids`, in one query.
    ///
    /// Ids with no matching row are simply absent from the result.
    pub async fn list_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<Application>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM applications WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Application>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
