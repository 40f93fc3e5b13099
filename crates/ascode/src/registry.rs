//! In-flight synchronizations.
//!
//! At most one synchronization per workflow runs at a time. A slot is taken
//! before any side effect and released when its [`SyncGuard`] drops: on a
//! synchronous failure, or when the reconciliation task ends.

use std::sync::Arc;

use chrono::Utc;
use conveyor_core::error::CoreError;
use conveyor_core::types::{DbId, Timestamp};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncSlot {
    pub started_at: Timestamp,
    /// Set once the push was accepted.
    pub operation_uuid: Option<Uuid>,
}

#[derive(Debug, Default)]
pub struct SyncRegistry {
    in_flight: DashMap<DbId, SyncSlot>,
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot of `workflow_id`, failing with `Conflict` when a
    /// synchronization of that workflow is already running.
    pub fn acquire(self: &Arc<Self>, workflow_id: DbId, workflow_name: &str) -> Result<SyncGuard, CoreError> {
        match self.in_flight.entry(workflow_id) {
            Entry::Occupied(_) => Err(CoreError::Conflict(format!(
                "a synchronization of workflow {workflow_name} is already in progress"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(SyncSlot {
                    started_at: Utc::now(),
                    operation_uuid: None,
                });
                Ok(SyncGuard {
                    registry: Arc::clone(self),
                    workflow_id,
                })
            }
        }
    }

    pub fn get(&self, workflow_id: DbId) -> Option<SyncSlot> {
        self.in_flight.get(&workflow_id).map(|slot| slot.clone())
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// Releases its workflow's slot on drop.
#[derive(Debug)]
pub struct SyncGuard {
    registry: Arc<SyncRegistry>,
    workflow_id: DbId,
}

impl SyncGuard {
    pub fn workflow_id(&self) -> DbId {
        self.workflow_id
    }

    /// Record the operation that carries this synchronization.
    pub fn attach(&self, operation_uuid: Uuid) {
        if let Some(mut slot) = self.registry.in_flight.get_mut(&self.workflow_id) {
            slot.operation_uuid = Some(operation_uuid);
        }
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.registry.in_flight.remove(&self.workflow_id);
        tracing::debug!(workflow_id = self.workflow_id, "Released synchronization slot");
    }
}
