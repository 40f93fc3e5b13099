//! Workflow export.
//!
//! Produces the document pushed to the repository. The document lists the
//! workflow tree and the names of the entities it references so the
//! repository copy is readable on its own.

use std::sync::Arc;

use async_trait::async_trait;
use conveyor_core::ascode::REPOSITORY_WEBHOOK_MODEL_NAME;
use conveyor_core::error::CoreError;
use conveyor_db::models::workflow::Workflow;
use conveyor_db::store::{EntityStore, WorkflowStore};
use conveyor_workflow::passes::{run_passes, LoaderFlags};
use serde::Serialize;

use crate::error::SyncResult;

/// Export document version.
pub const EXPORT_VERSION: &str = "v2.0";

/// How secrets embedded in the export are protected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionMode {
    /// Encrypted with the project's builtin key.
    #[default]
    BuiltinKey,
    /// Left as stored.
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Drop the hooks section when its only hook is the repository webhook.
    pub skip_if_only_one_repo_webhook: bool,
}

/// Serialized export document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPayload(pub serde_json::Value);

#[derive(Serialize)]
struct ExportDocument<'a> {
    version: &'static str,
    name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    encryption: EncryptionMode,
    workflow: serde_json::Value,
    applications: Vec<&'a str>,
    environments: Vec<&'a str>,
    pipelines: Vec<&'a str>,
    integrations: Vec<&'a str>,
}

#[async_trait]
pub trait WorkflowExporter: Send + Sync {
    /// Load the stored workflow with all its references and export it.
    async fn pull(
        &self,
        project_key: &str,
        workflow_name: &str,
        encryption: EncryptionMode,
        options: ExportOptions,
    ) -> SyncResult<ExportPayload>;

    /// Export an in-memory workflow as is.
    async fn export(&self, workflow: &Workflow, options: ExportOptions) -> SyncResult<ExportPayload>;
}

/// Exporter writing a JSON document.
pub struct JsonWorkflowExporter {
    workflows: Arc<dyn WorkflowStore>,
    entities: Arc<dyn EntityStore>,
}

impl JsonWorkflowExporter {
    pub fn new(workflows: Arc<dyn WorkflowStore>, entities: Arc<dyn EntityStore>) -> Self {
        Self { workflows, entities }
    }
}

#[async_trait]
impl WorkflowExporter for JsonWorkflowExporter {
    async fn pull(
        &self,
        project_key: &str,
        workflow_name: &str,
        encryption: EncryptionMode,
        options: ExportOptions,
    ) -> SyncResult<ExportPayload> {
        let workflow = self
            .workflows
            .find_workflow(project_key, workflow_name)
            .await?
            .ok_or_else(|| CoreError::not_found("workflow", workflow_name))?;

        let mut batch = [workflow];
        let flags = LoaderFlags {
            with_applications: true,
            with_environments: true,
            with_pipelines: true,
            with_integrations: true,
            with_icon: true,
            ..LoaderFlags::default()
        };
        run_passes(self.entities.as_ref(), &mut batch, flags).await?;
        let [workflow] = batch;

        render(&workflow, encryption, options)
    }

    async fn export(&self, workflow: &Workflow, options: ExportOptions) -> SyncResult<ExportPayload> {
        render(workflow, EncryptionMode::BuiltinKey, options)
    }
}

fn render(
    workflow: &Workflow,
    encryption: EncryptionMode,
    options: ExportOptions,
) -> SyncResult<ExportPayload> {
    let mut data = workflow.workflow_data.clone();
    if options.skip_if_only_one_repo_webhook {
        let hooks = data.hooks();
        if hooks.len() == 1 && hooks[0].hook_model_name == REPOSITORY_WEBHOOK_MODEL_NAME {
            data.for_each_node_mut(&mut |node| node.hooks.clear());
        }
    }

    let document = ExportDocument {
        version: EXPORT_VERSION,
        name: &workflow.name,
        description: &workflow.description,
        encryption,
        workflow: to_value(&data)?,
        applications: workflow.applications.values().map(|a| a.name.as_str()).collect(),
        environments: workflow.environments.values().map(|e| e.name.as_str()).collect(),
        pipelines: workflow.pipelines.values().map(|p| p.name.as_str()).collect(),
        integrations: workflow
            .project_integrations
            .values()
            .map(|i| i.name.as_str())
            .collect(),
    };
    Ok(ExportPayload(to_value(&document)?))
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(value)
        .map_err(|e| CoreError::Internal(format!("failed to serialize export: {e}")))
}
