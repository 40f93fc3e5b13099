//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row and, where the core writes rows, a create DTO.

pub mod application;
pub mod ascode_event;
pub mod environment;
pub mod integration;
pub mod pipeline;
pub mod template;
pub mod workflow;
