//! Node naming and structural validation of workflow bodies.
//!
//! Bodies submitted by callers may leave node names empty or reuse a name
//! twice. Before a body is exported it is normalized (every node gets a
//! unique, valid name) and then checked for structural consistency.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;
use crate::types::DbId;
use crate::workflow::{NodeType, WorkflowData};

/// Pattern every workflow and node name must match.
pub const NAME_PATTERN: &str = r"^[a-zA-Z0-9._-]{1,}$";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PATTERN).expect("valid regex"));

/// Whether `name` is acceptable as a workflow or node name.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Give every node a unique name.
///
/// Empty names are derived from the node's pipeline name (looked up in
/// `pipeline_names`) or from its type. A name already taken earlier in
/// traversal order gets the first free `_N` suffix, so the root keeps its
/// name and later duplicates are renamed.
pub fn normalize_node_names(data: &mut WorkflowData, pipeline_names: &HashMap<DbId, String>) {
    let mut taken: HashSet<String> = HashSet::new();

    data.for_each_node_mut(&mut |node| {
        let base = if node.name.is_empty() {
            let pipeline_name = node
                .context
                .map(|c| c.pipeline_id)
                .and_then(|id| pipeline_names.get(&id));
            match (node.node_type, pipeline_name) {
                (NodeType::Pipeline, Some(name)) => name.clone(),
                (node_type, _) => node_type.as_str().to_string(),
            }
        } else {
            node.name.clone()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while taken.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        taken.insert(candidate.clone());
        node.name = candidate;
    });
}

/// Check the shape of a workflow body.
///
/// Entity existence is not checked here; callers resolve references
/// against the store separately.
pub fn validate_structure(workflow_name: &str, data: &WorkflowData) -> Result<(), CoreError> {
    if !is_valid_name(workflow_name) {
        return Err(CoreError::Validation(format!(
            "invalid workflow name '{workflow_name}', must match {NAME_PATTERN}"
        )));
    }

    if data.node.node_type != NodeType::Pipeline {
        return Err(CoreError::Validation(
            "the root node must be a pipeline".into(),
        ));
    }
    let root_pipeline = data.node.context.map(|c| c.pipeline_id).unwrap_or(0);
    if root_pipeline == 0 {
        return Err(CoreError::Validation(
            "the root node must reference a pipeline".into(),
        ));
    }

    let nodes = data.nodes();
    let mut names = HashSet::with_capacity(nodes.len());
    for node in &nodes {
        if !is_valid_name(&node.name) {
            return Err(CoreError::Validation(format!(
                "invalid node name '{}', must match {NAME_PATTERN}",
                node.name
            )));
        }
        if !names.insert(node.name.as_str()) {
            return Err(CoreError::Validation(format!(
                "duplicate node name '{}'",
                node.name
            )));
        }
        if node.node_type == NodeType::Pipeline
            && node.context.map(|c| c.pipeline_id).unwrap_or(0) == 0
        {
            return Err(CoreError::Validation(format!(
                "pipeline node '{}' does not reference a pipeline",
                node.name
            )));
        }
    }

    for join in &data.joins {
        if join.node_type != NodeType::Join {
            return Err(CoreError::Validation(format!(
                "node '{}' is listed as a join but has type {}",
                join.name,
                join.node_type.as_str()
            )));
        }
        if join.parents.is_empty() {
            return Err(CoreError::Validation(format!(
                "join '{}' has no parent",
                join.name
            )));
        }
        if let Some(missing) = join.parents.iter().find(|p| !names.contains(p.as_str())) {
            return Err(CoreError::Validation(format!(
                "join '{}' references unknown parent '{missing}'",
                join.name
            )));
        }
    }

    Ok(())
}
