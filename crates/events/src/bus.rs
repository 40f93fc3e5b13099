//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PlatformEvent`]s and is
//! shared via `Arc<EventBus>`. Events carry the key of the project they
//! belong to so subscribers can follow one project's stream.

use chrono::{DateTime, Utc};
use conveyor_core::types::{Actor, DbId};
use conveyor_db::models::ascode_event::AsCodeEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event type names.
pub mod event_types {
    /// A repository synchronization completed and recorded an as-code event.
    pub const AS_CODE_EVENT: &str = "workflow.ascode_event";
}

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A domain event that occurred in a project.
///
/// Constructed via [`PlatformEvent::new`] and enriched with
/// [`with_source`](PlatformEvent::with_source),
/// [`with_actor`](PlatformEvent::with_actor) and
/// [`with_payload`](PlatformEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"workflow.ascode_event"`.
    pub event_type: String,

    /// Key of the project whose stream carries the event.
    pub project_key: String,

    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,

    pub actor_id: Option<DbId>,
    pub actor_username: Option<String>,

    /// Event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>, project_key: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            project_key: project_key.into(),
            source_entity_type: None,
            source_entity_id: None,
            actor_id: None,
            actor_username: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_actor(mut self, actor: &Actor) -> Self {
        self.actor_id = Some(actor.id);
        self.actor_username = Some(actor.username.clone());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Event announcing a recorded as-code event. The payload is the
    /// serialized event row.
    pub fn as_code(project_key: &str, event: &AsCodeEvent, actor: &Actor) -> Self {
        let payload = serde_json::to_value(event).unwrap_or_else(|e| {
            tracing::warn!(error = %e, event_id = event.id, "Failed to serialize as-code event");
            serde_json::Value::Null
        });
        Self::new(event_types::AS_CODE_EVENT, project_key)
            .with_source(event.entity_type.clone(), event.entity_id)
            .with_actor(actor)
            .with_payload(payload)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use conveyor_events::bus::{EventBus, PlatformEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PlatformEvent::new("workflow.updated", "PROJ"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest messages are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody listens.
    pub fn publish(&self, event: PlatformEvent) {
        let _ = self.sender.send(event);
    }

    /// Publish an as-code event on the project's stream.
    pub fn publish_as_code(&self, project_key: &str, event: &AsCodeEvent, actor: &Actor) {
        tracing::debug!(
            project_key,
            operation_uuid = %event.operation_uuid,
            outcome = %event.outcome,
            "Publishing as-code event"
        );
        self.publish(PlatformEvent::as_code(project_key, event, actor));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
