use serde::{Deserialize, Serialize};

/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// The consumer on whose behalf a request runs.
///
/// Authentication happens upstream; the core only carries the identity
/// through to operations and published events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: DbId,
    pub username: String,
}

impl Actor {
    pub fn new(id: DbId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }

    /// Identity used when no consumer was supplied by the transport.
    pub fn anonymous() -> Self {
        Self::new(0, "anonymous")
    }
}
