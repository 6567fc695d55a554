//! Rendered blocks: one per non-empty leaf.

use std::sync::Arc;

use serde_json::Value;
use weave_tree::SectionType;

/// A leaf's text together with the context the walk derived for it.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    /// Formatted text.
    pub value: String,
    /// Section; `None` for text outside every section component.
    pub section: Option<SectionType>,
    /// Effective weight in `[0, 1]`.
    pub weight: f64,
    /// Path of the leaf node.
    pub component_path: String,
    /// Data update time of the leaf node, in ms.
    pub update_data_time_ms: Option<f64>,
    /// Enclosing chunk paths, outermost first.
    pub chunks: Arc<Vec<String>>,
    /// Provenance inherited from the nearest `source` prop.
    pub source: Option<Value>,
    /// Context group index.
    pub index: Option<usize>,
}

impl Block {
    /// Empty suffix used when the tree renders none.
    #[must_use]
    pub fn empty_suffix() -> Self {
        Self {
            value: String::new(),
            section: Some(SectionType::Suffix),
            weight: 1.0,
            component_path: String::new(),
            update_data_time_ms: None,
            chunks: Arc::new(Vec::new()),
            source: None,
            index: None,
        }
    }

    /// Whether this block belongs to the prefix section.
    #[must_use]
    pub fn is_prefix(&self) -> bool {
        self.section == Some(SectionType::Prefix)
    }

    /// Path of the innermost enclosing chunk.
    #[must_use]
    pub fn innermost_chunk(&self) -> Option<&str> {
        self.chunks.last().map(String::as_str)
    }

    /// Whether the chunk at `path` encloses this block.
    #[must_use]
    pub fn in_chunk(&self, path: &str) -> bool {
        self.chunks.iter().any(|chunk| chunk == path)
    }
}

/// A block after elision.
#[derive(Clone, Debug, PartialEq)]
pub struct ElidedBlock {
    /// The block as rendered.
    pub block: Block,
    /// Token count of the full value.
    pub tokens: usize,
    /// What survived: the full value, a truncation, or `""`.
    pub elided_value: String,
    /// Token count of `elided_value`.
    pub elided_tokens: usize,
}

impl ElidedBlock {
    /// Kept whole.
    #[must_use]
    pub fn kept(block: Block, tokens: usize) -> Self {
        Self {
            elided_value: block.value.clone(),
            elided_tokens: tokens,
            block,
            tokens,
        }
    }

    /// Removed entirely.
    #[must_use]
    pub fn dropped(block: Block, tokens: usize) -> Self {
        Self {
            block,
            tokens,
            elided_value: String::new(),
            elided_tokens: 0,
        }
    }
}
