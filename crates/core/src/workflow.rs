//! Workflow node tree.
//!
//! A workflow is a tree of [`Node`]s rooted at [`WorkflowData::node`], plus
//! a list of join nodes that merge several branches. Each node may bind an
//! application, environment, pipeline and integration through its
//! [`NodeContext`]; references are plain ids and are resolved separately
//! (see [`crate::references`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Tree types
// ---------------------------------------------------------------------------

/// Stored shape of a workflow: the root node and the join nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowData {
    pub node: Node,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<Node>,
}

/// Kind of a node in the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Pipeline,
    Join,
    Fork,
    #[serde(rename = "outgoinghook")]
    OutgoingHook,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pipeline => "pipeline",
            Self::Join => "join",
            Self::Fork => "fork",
            Self::OutgoingHook => "outgoinghook",
        }
    }
}

/// A unit of execution in the workflow tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub id: DbId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<NodeContext>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<NodeHook>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<NodeTrigger>,
    /// Names of the parent nodes, only set on join nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// Entity references attached to a node. Zero means "unset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeContext {
    #[serde(default)]
    pub application_id: DbId,
    #[serde(default)]
    pub environment_id: DbId,
    #[serde(default)]
    pub pipeline_id: DbId,
    #[serde(default)]
    pub project_integration_id: DbId,
}

/// A hook descriptor owned by a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHook {
    pub hook_model_name: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

/// Edge from a node to one of its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTrigger {
    pub child_node: Node,
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

impl Node {
    /// A pipeline node bound to the given context.
    pub fn pipeline(id: DbId, name: impl Into<String>, context: NodeContext) -> Self {
        Self {
            id,
            name: name.into(),
            node_type: NodeType::Pipeline,
            context: Some(context),
            ..Self::default()
        }
    }

    /// Attach `child` under this node.
    pub fn with_child(mut self, child: Node) -> Self {
        self.triggers.push(NodeTrigger { child_node: child });
        self
    }

    pub fn with_hook(mut self, hook: NodeHook) -> Self {
        self.hooks.push(hook);
        self
    }
}

impl NodeContext {
    pub fn application(application_id: DbId) -> Self {
        Self {
            application_id,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

impl WorkflowData {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            joins: Vec::new(),
        }
    }

    /// Every node of the tree in pre-order: root branch first, then each
    /// join with its own descendants.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        collect_nodes(&self.node, &mut out);
        for join in &self.joins {
            collect_nodes(join, &mut out);
        }
        out
    }

    /// Apply `f` to every node, in the same order as [`WorkflowData::nodes`].
    pub fn for_each_node_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        visit_nodes_mut(&mut self.node, f);
        for join in &mut self.joins {
            visit_nodes_mut(join, f);
        }
    }

    /// All hooks declared anywhere in the tree.
    pub fn hooks(&self) -> Vec<&NodeHook> {
        self.nodes().into_iter().flat_map(|n| n.hooks.iter()).collect()
    }

    /// Application bound to the root node, if any.
    pub fn root_application_id(&self) -> Option<DbId> {
        self.node
            .context
            .map(|c| c.application_id)
            .filter(|id| *id != 0)
    }
}

fn collect_nodes<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    out.push(node);
    for trigger in &node.triggers {
        collect_nodes(&trigger.child_node, out);
    }
}

fn visit_nodes_mut(node: &mut Node, f: &mut impl FnMut(&mut Node)) {
    f(node);
    for trigger in &mut node.triggers {
        visit_nodes_mut(&mut trigger.child_node, f);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
