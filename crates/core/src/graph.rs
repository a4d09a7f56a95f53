//! # Graph Snapshots
//!
//! [`Entity::build_graph`](crate::Entity::build_graph) freezes an entity
//! tree into a [`GraphNode`] tree. Every node is resolved exactly once during
//! the walk and never again, so a snapshot keeps showing the values it was
//! taken with even after leaves are reset.
//!
//! ## Children
//!
//! A node's children are its operands in operand order, followed by the
//! scope conditions its leaf captured.
//!
//! ## ASCII Rendering
//!
//! ```text
//! total = 20
//! ├── A + B = 5
//! │   ├── A = 2
//! │   └── B = 3
//! └── C = 4
//!       [arbitrary] unit: kg
//! ```
//!
//! Metadata sits beneath its node at the child indentation: `[arbitrary]`
//! entries first, then `[value]` entries, each sorted by key. The line is
//! led by `│ ` when the node has rendered children below it and by two
//! spaces otherwise.
//!
//! Graphviz and JSON exports are available through [`GraphNode::render_dot`]
//! and [`GraphNode::to_json`].

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Serialize, Serializer};
use tracing::trace;

use crate::capability::Operand;
use crate::config::RenderOptions;
use crate::entity::{AnyEntity, EntityInner};
use crate::error::EntityError;

// ============================================================================
// Snapshot Values
// ============================================================================

/// A resolved value captured in a snapshot.
///
/// Keeps both the rendered text and the typed value, which can be recovered
/// with [`SnapshotValue::downcast_ref`].
#[derive(Clone)]
pub struct SnapshotValue {
    display: String,
    type_name: &'static str,
    payload: Arc<dyn Any + Send + Sync>,
}

impl SnapshotValue {
    pub fn new<T: Operand>(value: T) -> Self {
        Self {
            display: value.to_string(),
            type_name: std::any::type_name::<T>(),
            payload: Arc::new(value),
        }
    }

    /// The typed value, if it is a `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        (*self.payload).downcast_ref::<T>()
    }

    /// The value rendered with `Display`.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for SnapshotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl fmt::Debug for SnapshotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotValue")
            .field("display", &self.display)
            .field("type", &self.type_name)
            .finish()
    }
}

impl Serialize for SnapshotValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display)
    }
}

// ============================================================================
// Graph Node
// ============================================================================

/// An immutable, resolved snapshot of one entity and its subtree.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub name: String,
    pub description: Option<String>,
    pub value: SnapshotValue,
    pub is_leaf: bool,
    pub operation: Option<String>,
    pub children: Vec<GraphNode>,
    pub arbitrary_state: BTreeMap<String, serde_json::Value>,
    pub value_state: BTreeMap<String, SnapshotValue>,
}

/// Snapshot `entity`, whose value the caller has already resolved.
pub(crate) fn snapshot<T: Operand>(
    entity: &EntityInner<T>,
    value: T,
) -> Result<GraphNode, EntityError> {
    trace!(entity = entity.name(), "snapshot");
    let children = entity
        .operands()
        .iter()
        .chain(entity.conditions())
        .map(|child| child.snapshot())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GraphNode {
        name: entity.name().to_string(),
        description: entity.description().map(str::to_string),
        value: SnapshotValue::new(value),
        is_leaf: entity.is_leaf(),
        operation: entity.operation().map(str::to_string),
        children,
        arbitrary_state: entity.arbitrary_state().clone(),
        value_state: entity
            .value_state()
            .iter()
            .map(|(key, value)| (key.clone(), SnapshotValue::new(value.clone())))
            .collect(),
    })
}

impl GraphNode {
    /// Description if present, otherwise name.
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    /// Total number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(GraphNode::node_count).sum::<usize>()
    }

    /// Longest path to a descendant, in edges. A lone leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// First node, depth-first, whose name or label matches.
    pub fn find(&self, name: &str) -> Option<&GraphNode> {
        if self.name == name || self.label() == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    // ========================================================================
    // ASCII
    // ========================================================================

    /// Render as an ASCII tree with default options.
    pub fn render(&self) -> String {
        self.render_with(&RenderOptions::default())
    }

    pub fn render_with(&self, options: &RenderOptions) -> String {
        let mut lines = vec![format!("{} = {}", self.label(), value_text(&self.value, options))];
        self.render_below("", 0, options, &mut lines);
        lines.join("\n")
    }

    /// Metadata and children of a node already written, indented by `prefix`.
    fn render_below(
        &self,
        prefix: &str,
        depth: usize,
        options: &RenderOptions,
        lines: &mut Vec<String>,
    ) {
        let expand = options.max_depth.map_or(true, |max| depth < max);
        let children: &[GraphNode] = if expand { &self.children } else { &[] };

        if options.show_metadata {
            let lead = if children.is_empty() { "  " } else { "│ " };
            for (key, value) in &self.arbitrary_state {
                lines.push(format!("{prefix}{lead}[arbitrary] {key}: {}", json_text(value)));
            }
            for (key, value) in &self.value_state {
                lines.push(format!(
                    "{prefix}{lead}[value] {key}: {}",
                    value_text(value, options)
                ));
            }
        }

        for (index, child) in children.iter().enumerate() {
            let last = index + 1 == children.len();
            let (connector, continuation) = if last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            lines.push(format!(
                "{prefix}{connector}{} = {}",
                child.label(),
                value_text(&child.value, options)
            ));
            let child_prefix = format!("{prefix}{continuation}");
            child.render_below(&child_prefix, depth + 1, options, lines);
        }
    }

    // ========================================================================
    // Exports
    // ========================================================================

    /// The snapshot as a petgraph graph. Node weights are `label = value`;
    /// edge weights are child positions.
    pub fn to_digraph(&self) -> DiGraph<String, usize> {
        let mut graph = DiGraph::new();
        self.add_to(&mut graph);
        graph
    }

    fn add_to(&self, graph: &mut DiGraph<String, usize>) -> NodeIndex {
        let index = graph.add_node(format!("{} = {}", self.label(), self.value));
        for (position, child) in self.children.iter().enumerate() {
            let child_index = child.add_to(graph);
            graph.add_edge(index, child_index, position);
        }
        index
    }

    /// Graphviz DOT text for the snapshot.
    pub fn render_dot(&self) -> String {
        let graph = self.to_digraph();
        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn value_text(value: &SnapshotValue, options: &RenderOptions) -> String {
    let text = value.as_str();
    match options.value_width {
        Some(width) if text.chars().count() > width => {
            let mut truncated: String = text.chars().take(width).collect();
            truncated.push('…');
            truncated
        }
        _ => text.to_string(),
    }
}

// Strings render bare; everything else as compact JSON.
fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
