//! Workflow as-code synchronization.
//!
//! Converting a workflow to or from its repository representation is a
//! two-phase protocol: the request is validated, a push is handed to the
//! external repositories service and the resulting [`Operation`] is
//! returned at once; a detached reconciliation task then follows the
//! operation to completion, records an as-code event and publishes it.
//!
//! [`Operation`]: conveyor_core::operation::Operation

pub mod background;
pub mod cache;
pub mod error;
pub mod export;
pub mod git;
pub mod orchestrator;
pub mod reconcile;
pub mod registry;

pub use background::BackgroundRunner;
pub use cache::{MokaOperationCache, OperationCache};
pub use error::{GitServiceError, SyncError, SyncResult};
pub use export::{JsonWorkflowExporter, WorkflowExporter};
pub use git::{GitOperationService, HttpGitOperationService, PushRequest};
pub use orchestrator::{AsCodeDeps, AsCodeOrchestrator, SyncRequest, WorkflowUpdate};
pub use reconcile::{EntityData, OperationReconciler, ReconcileSettings, ReconciliationCollaborator};
pub use registry::{SyncGuard, SyncRegistry};
