use std::sync::Arc;

use conveyor_ascode::AsCodeOrchestrator;
use conveyor_db::store::{EntityStore, WorkflowStore};
use conveyor_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Database pool, `None` when running on an in-memory store.
    pub pool: Option<conveyor_db::DbPool>,
    pub config: Arc<ServerConfig>,
    pub workflows: Arc<dyn WorkflowStore>,
    pub entities: Arc<dyn EntityStore>,
    pub ascode: Arc<AsCodeOrchestrator>,
    pub event_bus: Arc<EventBus>,
}
