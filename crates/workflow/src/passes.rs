//! Loader passes.
//!
//! Each pass owns one field of [`Workflow`] and resolves it for the whole
//! batch. Passes share no state, so any subset may run in any order and a
//! rerun yields the same result.

use std::collections::{BTreeSet, HashMap};

use conveyor_core::references::collect_repositories;
use conveyor_core::types::DbId;
use conveyor_db::models::application::Application;
use conveyor_db::models::ascode_event::AsCodeEvent;
use conveyor_db::models::environment::Environment;
use conveyor_db::models::integration::ProjectIntegration;
use conveyor_db::models::pipeline::Pipeline;
use conveyor_db::models::workflow::Workflow;
use conveyor_db::store::EntityStore;

use crate::bulk::{load_referenced, ReferenceTarget};
use crate::error::LoadResult;
use crate::materialize::materialize;

// ---------------------------------------------------------------------------
// Pass selection
// ---------------------------------------------------------------------------

/// Which references a caller wants resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderFlags {
    pub with_applications: bool,
    pub with_environments: bool,
    pub with_pipelines: bool,
    pub with_integrations: bool,
    /// Keep icons. Icons are stripped unless asked for.
    pub with_icon: bool,
    pub with_as_code_events: bool,
    pub with_template: bool,
}

impl LoaderFlags {
    /// Every reference resolved, icons kept.
    pub fn all() -> Self {
        Self {
            with_applications: true,
            with_environments: true,
            with_pipelines: true,
            with_integrations: true,
            with_icon: true,
            with_as_code_events: true,
            with_template: true,
        }
    }

    /// Passes selected by these flags, each at most once.
    pub fn passes(&self) -> Vec<LoaderPass> {
        [
            (self.with_applications, LoaderPass::Applications),
            (self.with_environments, LoaderPass::Environments),
            (self.with_pipelines, LoaderPass::Pipelines),
            (self.with_integrations, LoaderPass::Integrations),
            (self.with_template, LoaderPass::Templates),
            (self.with_as_code_events, LoaderPass::AsCodeEvents),
            (!self.with_icon, LoaderPass::StripIcons),
        ]
        .into_iter()
        .filter_map(|(selected, pass)| selected.then_some(pass))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderPass {
    Applications,
    Environments,
    Pipelines,
    Integrations,
    Templates,
    AsCodeEvents,
    StripIcons,
}

/// Run the passes selected by `flags` over the batch.
pub async fn run_passes(
    store: &dyn EntityStore,
    workflows: &mut [Workflow],
    flags: LoaderFlags,
) -> LoadResult<()> {
    if workflows.is_empty() {
        return Ok(());
    }
    for pass in flags.passes() {
        run_pass(store, workflows, pass).await?;
    }
    Ok(())
}

pub async fn run_pass(
    store: &dyn EntityStore,
    workflows: &mut [Workflow],
    pass: LoaderPass,
) -> LoadResult<()> {
    match pass {
        LoaderPass::Applications => resolve::<Application>(store, workflows).await,
        LoaderPass::Environments => resolve::<Environment>(store, workflows).await,
        LoaderPass::Pipelines => resolve::<Pipeline>(store, workflows).await,
        LoaderPass::Integrations => resolve::<ProjectIntegration>(store, workflows).await,
        LoaderPass::Templates => load_templates(store, workflows).await,
        LoaderPass::AsCodeEvents => load_as_code_events(store, workflows).await,
        LoaderPass::StripIcons => {
            strip_icons(workflows);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Node references
// ---------------------------------------------------------------------------

/// Resolve every `T` referenced by the batch into the workflows' `T` map.
pub async fn resolve<T: ReferenceTarget>(
    store: &dyn EntityStore,
    workflows: &mut [Workflow],
) -> LoadResult<()> {
    let index = load_referenced::<T>(store, workflows).await?;
    materialize(workflows, &index)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Attach the template instance each workflow was generated from.
///
/// Workflows without an instance are reset to "not from a template".
pub async fn load_templates(store: &dyn EntityStore, workflows: &mut [Workflow]) -> LoadResult<()> {
    let ids: Vec<DbId> = workflows
        .iter()
        .map(|w| w.id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if ids.is_empty() {
        return Ok(());
    }
    let instances = store.load_template_instances_by_workflow_ids(&ids).await?;

    let mut by_workflow = HashMap::new();
    for instance in instances {
        if let Some(workflow_id) = instance.workflow_id {
            by_workflow.insert(workflow_id, instance);
        }
    }

    for workflow in workflows.iter_mut() {
        match by_workflow.get(&workflow.id) {
            Some(instance) => {
                workflow.from_template = instance.from_template();
                workflow.template_up_to_date = instance.up_to_date();
                workflow.template_instance = Some(instance.clone());
            }
            None => {
                workflow.template_instance = None;
                workflow.from_template.clear();
                workflow.template_up_to_date = false;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// As-code events
// ---------------------------------------------------------------------------

/// Attach the as-code events recorded for each workflow's repository.
///
/// Workflows that are not linked to a repository get no events.
pub async fn load_as_code_events(
    store: &dyn EntityStore,
    workflows: &mut [Workflow],
) -> LoadResult<()> {
    let repositories: Vec<String> =
        collect_repositories(workflows.iter().map(|w| w.from_repository.as_str()))
            .into_iter()
            .collect();

    let events = if repositories.is_empty() {
        Vec::new()
    } else {
        store.load_as_code_events_by_repositories(&repositories).await?
    };

    let mut by_repository: HashMap<&str, Vec<AsCodeEvent>> = HashMap::new();
    for event in &events {
        by_repository
            .entry(event.from_repo.as_str())
            .or_default()
            .push(event.clone());
    }

    for workflow in workflows.iter_mut() {
        workflow.as_code_events = by_repository
            .get(workflow.from_repository.as_str())
            .filter(|_| !workflow.from_repository.is_empty())
            .cloned()
            .unwrap_or_default();
    }
    Ok(())
}

/// Attach the as-code events recorded against each workflow's id.
///
/// Catches syncs that produced events before the workflow was linked to
/// its repository.
pub async fn load_as_code_events_by_workflow(
    store: &dyn EntityStore,
    workflows: &mut [Workflow],
) -> LoadResult<()> {
    let ids: Vec<DbId> = workflows
        .iter()
        .map(|w| w.id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if ids.is_empty() {
        return Ok(());
    }
    let events = store.load_as_code_events_by_workflow_ids(&ids).await?;

    for workflow in workflows.iter_mut() {
        workflow.as_code_events = events
            .iter()
            .filter(|e| e.entity_id == workflow.id)
            .cloned()
            .collect();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Icons
// ---------------------------------------------------------------------------

pub fn strip_icons(workflows: &mut [Workflow]) {
    for workflow in workflows {
        workflow.icon.clear();
    }
}
