//! Tracing subscriber for the event bus.
//!
//! [`EventLogger`] follows the broadcast channel and emits one structured
//! log line per event. It runs as a long-lived background task and exits
//! when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the channel closes.
    pub async fn run(mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        event_type = %event.event_type,
                        project_key = %event.project_key,
                        entity_type = event.source_entity_type.as_deref().unwrap_or(""),
                        entity_id = event.source_entity_id,
                        actor = event.actor_username.as_deref().unwrap_or(""),
                        "Platform event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
    }
}
