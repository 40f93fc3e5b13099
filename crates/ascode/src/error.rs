use conveyor_core::error::CoreError;
use conveyor_workflow::LoadError;

/// Errors from the repositories service client.
#[derive(Debug, thiserror::Error)]
pub enum GitServiceError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("Repositories service error ({status}): {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Git(#[from] GitServiceError),
}

pub type SyncResult<T> = Result<T, SyncError>;
