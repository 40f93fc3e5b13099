//! Operation cache.
//!
//! Holds the latest observed state of every push operation, keyed by UUID.
//! Entries expire after a fixed time-to-live; writes are last-write-wins.

use std::time::Duration;

use async_trait::async_trait;
use conveyor_core::operation::Operation;
use moka::future::Cache;
use uuid::Uuid;

pub const DEFAULT_TTL_SECS: u64 = 600;

const DEFAULT_CAPACITY: u64 = 10_000;

#[async_trait]
pub trait OperationCache: Send + Sync {
    async fn get(&self, uuid: Uuid) -> Option<Operation>;

    /// Store `operation` under its UUID, replacing any previous state.
    async fn set(&self, operation: Operation);
}

/// In-process cache backed by `moka`.
#[derive(Clone)]
pub struct MokaOperationCache {
    cache: Cache<Uuid, Operation>,
}

impl MokaOperationCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(DEFAULT_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }
}

impl Default for MokaOperationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OperationCache for MokaOperationCache {
    async fn get(&self, uuid: Uuid) -> Option<Operation> {
        self.cache.get(&uuid).await
    }

    async fn set(&self, operation: Operation) {
        self.cache.insert(operation.uuid, operation).await;
    }
}
