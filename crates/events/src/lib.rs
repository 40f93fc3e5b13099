//! Conveyor event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope, scoped to a project.
//! - [`EventLogger`]: background subscriber that traces every event.

pub mod bus;
pub mod logger;

pub use bus::{event_types, EventBus, PlatformEvent};
pub use logger::EventLogger;
