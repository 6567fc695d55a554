//! Immutable snapshot of the virtual tree.

use serde::Serialize;
use serde_json::Value;

use crate::element::{Key, Props};
use crate::reconciler::VirtualNode;

/// The subset of props that survives into nodes and snapshots.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProps {
    /// Explicit sibling key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Declared (unclamped) weight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Provenance payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
}

impl From<&Props> for NodeProps {
    fn from(props: &Props) -> Self {
        Self {
            key: props.key.clone(),
            weight: props.weight,
            source: props.source.clone(),
        }
    }
}

/// Per-node statistics captured at snapshot time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatistics {
    /// Time spent in this node's data consumers since the previous snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_data_time_ms: Option<f64>,
}

/// A frozen node. Never mutated after the snapshot is taken.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    name: String,
    path: String,
    props: NodeProps,
    children: Vec<SnapshotNode>,
    statistics: NodeStatistics,
}

impl SnapshotNode {
    /// Leaf text, for primitive nodes.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Component name, `f` for fragments, `#text` for primitives.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Props relevant to walking.
    #[must_use]
    pub fn props(&self) -> &NodeProps {
        &self.props
    }

    /// Child nodes in document order.
    #[must_use]
    pub fn children(&self) -> &[SnapshotNode] {
        &self.children
    }

    /// Statistics captured for this node.
    #[must_use]
    pub fn statistics(&self) -> NodeStatistics {
        self.statistics
    }

    /// Pre-order search by path.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&SnapshotNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

/// Copy the live tree. The live tree is only read.
///
/// `cancelled` is polled once per node; `None` comes back as soon as it
/// returns true and the partial copy is discarded.
pub(crate) fn freeze(node: &VirtualNode, cancelled: &dyn Fn() -> bool) -> Option<SnapshotNode> {
    if cancelled() {
        return None;
    }

    let mut children = Vec::with_capacity(node.children().len());
    for child in node.children() {
        children.push(freeze(child, cancelled)?);
    }

    let elapsed = node.update_data_time_ms();
    Some(SnapshotNode {
        value: node.value().map(str::to_string),
        name: node.name().to_string(),
        path: node.path().to_string(),
        props: node.props().clone(),
        children,
        statistics: NodeStatistics {
            update_data_time_ms: (elapsed > 0.0).then_some(elapsed),
        },
    })
}
