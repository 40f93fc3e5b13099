//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod application_repo;
pub mod ascode_event_repo;
pub mod environment_repo;
pub mod integration_repo;
pub mod pipeline_repo;
pub mod template_instance_repo;
pub mod workflow_repo;

pub use application_repo::ApplicationRepo;
pub use ascode_event_repo::AsCodeEventRepo;
pub use environment_repo::EnvironmentRepo;
pub use integration_repo::IntegrationRepo;
pub use pipeline_repo::PipelineRepo;
pub use template_instance_repo::TemplateInstanceRepo;
pub use workflow_repo::WorkflowRepo;
