//! Conveyor core domain.
//!
//! Pure types and rules with no I/O: the workflow node tree, reference
//! collection, as-code preconditions and hook rules, node naming, and the
//! push operation model shared by the storage, sync and HTTP layers.

pub mod ascode;
pub mod error;
pub mod naming;
pub mod operation;
pub mod references;
pub mod types;
pub mod workflow;
