//! Snapshot walker and context transformers.
//!
//! The walker visits a snapshot in pre-order. At every node it folds the
//! transformer list over the parent's [`WalkContext`] to get the node's own
//! context, hands it to the visitor, and uses it as the base for the
//! node's children. Context flows strictly downward, so siblings never see
//! each other's changes.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::components::CHUNK_NAME;
use crate::snapshot::SnapshotNode;

/// Prompt section a subtree belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    /// Text before the cursor.
    Prefix,
    /// Supporting context.
    Context,
    /// Text after the cursor.
    Suffix,
}

/// Context derived for one node during a walk.
#[derive(Clone, Debug, PartialEq)]
pub struct WalkContext {
    /// Product of clamped weights from the root down to this node.
    pub weight: f64,
    /// Paths of enclosing chunks, outermost first. Shared until modified.
    pub chunks: Arc<Vec<String>>,
    /// Nearest ancestor's `source` prop.
    pub source: Option<Value>,
    /// Section this subtree renders into.
    pub section: Option<SectionType>,
    /// Context group index.
    pub index: Option<usize>,
}

impl Default for WalkContext {
    fn default() -> Self {
        Self {
            weight: 1.0,
            chunks: Arc::new(Vec::new()),
            source: None,
            section: None,
            index: None,
        }
    }
}

impl WalkContext {
    /// Path of the innermost enclosing chunk.
    #[must_use]
    pub fn innermost_chunk(&self) -> Option<&str> {
        self.chunks.last().map(String::as_str)
    }

    /// Whether the chunk at `path` encloses this node.
    #[must_use]
    pub fn in_chunk(&self, path: &str) -> bool {
        self.chunks.iter().any(|chunk| chunk == path)
    }
}

/// `(node, parent, inherited) -> derived` step of the context fold.
pub type Transformer = Box<dyn Fn(&SnapshotNode, Option<&SnapshotNode>, WalkContext) -> WalkContext>;

/// Box a closure as a [`Transformer`].
pub fn transformer<F>(f: F) -> Transformer
where
    F: Fn(&SnapshotNode, Option<&SnapshotNode>, WalkContext) -> WalkContext + 'static,
{
    Box::new(f)
}

/// Multiply the inherited weight by the node's clamped declared weight.
pub fn weight_transformer(
    node: &SnapshotNode,
    _parent: Option<&SnapshotNode>,
    mut context: WalkContext,
) -> WalkContext {
    let declared = node
        .props()
        .weight
        .filter(|w| !w.is_nan())
        .unwrap_or(1.0)
        .clamp(0.0, 1.0);
    context.weight *= declared;
    context
}

/// Record `Chunk` nodes in the chunk path set.
pub fn chunk_transformer(
    node: &SnapshotNode,
    _parent: Option<&SnapshotNode>,
    mut context: WalkContext,
) -> WalkContext {
    if node.name() == CHUNK_NAME {
        Arc::make_mut(&mut context.chunks).push(node.path().to_string());
    }
    context
}

/// Propagate an explicit `source` prop to the subtree.
pub fn source_transformer(
    node: &SnapshotNode,
    _parent: Option<&SnapshotNode>,
    mut context: WalkContext,
) -> WalkContext {
    if let Some(source) = &node.props().source {
        context.source = Some(source.clone());
    }
    context
}

/// Weight, chunk and source transformers, in that order.
pub fn default_transformers() -> Vec<Transformer> {
    vec![
        transformer(weight_transformer),
        transformer(chunk_transformer),
        transformer(source_transformer),
    ]
}

/// Pre-order walker over a snapshot.
pub struct SnapshotWalker<'a> {
    root: &'a SnapshotNode,
    transformers: Vec<Transformer>,
}

impl<'a> SnapshotWalker<'a> {
    /// Walker over `root` folding `transformers` left to right.
    pub fn new(root: &'a SnapshotNode, transformers: Vec<Transformer>) -> Self {
        Self { root, transformers }
    }

    /// Visit every node. Returning `false` from `visitor` skips the node's
    /// subtree.
    pub fn walk_snapshot<F>(&self, mut visitor: F)
    where
        F: FnMut(&SnapshotNode, Option<&SnapshotNode>, &WalkContext) -> bool,
    {
        self.walk(self.root, None, &WalkContext::default(), &mut visitor);
    }

    fn walk<F>(
        &self,
        node: &SnapshotNode,
        parent: Option<&SnapshotNode>,
        inherited: &WalkContext,
        visitor: &mut F,
    ) where
        F: FnMut(&SnapshotNode, Option<&SnapshotNode>, &WalkContext) -> bool,
    {
        let context = self
            .transformers
            .iter()
            .fold(inherited.clone(), |context, transform| {
                transform(node, parent, context)
            });
        if !visitor(node, parent, &context) {
            return;
        }
        for child in node.children() {
            self.walk(child, Some(node), &context, visitor);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
