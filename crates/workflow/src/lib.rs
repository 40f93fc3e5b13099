//! Bulk loading of workflow references.
//!
//! A listing returns bare workflows; the passes in [`passes`] then resolve
//! one kind of reference each across the whole batch with a single store
//! call per kind:
//!
//! 1. [`bulk`] collects the distinct keys of a kind and fetches them once.
//! 2. [`materialize`] copies the fetched snapshots into each workflow's map,
//!    failing the batch on the first dangling reference.

pub mod bulk;
pub mod error;
pub mod listing;
pub mod materialize;
pub mod passes;

pub use error::{LoadError, LoadResult};
pub use listing::list_workflows;
pub use passes::{run_passes, LoaderFlags, LoaderPass};
