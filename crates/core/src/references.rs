//! Reference collection over workflow trees.
//!
//! Nodes point at other entities by id. Resolving them one node at a time
//! would cost one store round-trip per reference, so loaders first collect
//! the distinct ids of one kind across a whole batch of trees and fetch
//! them together.

use std::collections::BTreeSet;

use crate::types::DbId;
use crate::workflow::{NodeContext, WorkflowData};

/// Entity kinds a node context can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Application,
    Environment,
    Pipeline,
    Integration,
}

impl ReferenceKind {
    /// Human-readable entity name used in errors and logs.
    pub fn entity_name(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Environment => "environment",
            Self::Pipeline => "pipeline",
            Self::Integration => "integration",
        }
    }

    /// The referenced id of this kind, `None` when unset (zero).
    pub fn id_in(self, context: &NodeContext) -> Option<DbId> {
        let id = match self {
            Self::Application => context.application_id,
            Self::Environment => context.environment_id,
            Self::Pipeline => context.pipeline_id,
            Self::Integration => context.project_integration_id,
        };
        (id != 0).then_some(id)
    }
}

/// `(node_id, referenced_id)` pairs for one kind, in traversal order.
pub fn node_references(data: &WorkflowData, kind: ReferenceKind) -> Vec<(DbId, DbId)> {
    data.nodes()
        .into_iter()
        .filter_map(|node| {
            let context = node.context.as_ref()?;
            kind.id_in(context).map(|id| (node.id, id))
        })
        .collect()
}

/// Distinct non-zero ids of `kind` referenced anywhere in `trees`.
pub fn collect_references<'a, I>(trees: I, kind: ReferenceKind) -> BTreeSet<DbId>
where
    I: IntoIterator<Item = &'a WorkflowData>,
{
    trees
        .into_iter()
        .flat_map(|data| node_references(data, kind))
        .map(|(_, id)| id)
        .collect()
}

/// Distinct non-empty repository names, the keys of as-code event lookups.
pub fn collect_repositories<'a, I>(repositories: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    repositories
        .into_iter()
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}
