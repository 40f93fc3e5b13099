//! Repository for the `as_code_events` table.

use conveyor_core::types::DbId;
use sqlx::PgPool;

use crate::models::ascode_event::{AsCodeEvent, NewAsCodeEvent};

const COLUMNS: &str = "id, entity_type, from_repo, operation_uuid, entity_id, entity_name, \
    outcome, pull_request_id, pull_request_url, username, created_at";

/// Append-only access to as-code events.
pub struct AsCodeEventRepo;

impl AsCodeEventRepo {
    /// Record a new event, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewAsCodeEvent) -> Result<AsCodeEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO as_code_events (\
                entity_type, from_repo, operation_uuid, entity_id, entity_name, \
                outcome, pull_request_id, pull_request_url, username\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AsCodeEvent>(&query)
            .bind(input.entity_type.as_str())
            .bind(&input.from_repo)
            .bind(input.operation_uuid)
            .bind(input.entity_id)
            .bind(&input.entity_name)
            .bind(&input.outcome)
            .bind(input.pull_request_id)
            .bind(input.pull_request_url.as_deref())
            .bind(&input.username)
            .fetch_one(pool)
            .await
    }

    /// Events recorded for any of the given repositories, oldest first.
    pub async fn list_by_repositories(
        pool: &PgPool,
        repositories: &[String],
    ) -> Result<Vec<AsCodeEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM as_code_events WHERE from_repo = ANY($1) ORDER BY created_at, id"
        );
        sqlx::query_as::<_, AsCodeEvent>(&query)
            .bind(repositories)
            .fetch_all(pool)
            .await
    }

    /// Events recorded for any of the given entities of `entity_type`.
    pub async fn list_by_entity_ids(
        pool: &PgPool,
        entity_type: &str,
        entity_ids: &[DbId],
    ) -> Result<Vec<AsCodeEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM as_code_events \
             WHERE entity_type = $1 AND entity_id = ANY($2) \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, AsCodeEvent>(&query)
            .bind(entity_type)
            .bind(entity_ids)
            .fetch_all(pool)
            .await
    }
}
