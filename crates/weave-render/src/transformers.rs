//! Walk transformers that assign prompt sections.

use std::cell::Cell;

use weave_tree::{SectionType, SnapshotNode, Transformer, WalkContext, transformer};

use crate::constants::{AFTER_CURSOR, BEFORE_CURSOR, CONTEXT_COMPONENTS};

/// Whether `name` is a context group component.
#[must_use]
pub fn is_context_component(name: &str) -> bool {
    CONTEXT_COMPONENTS.contains(&name)
}

/// Tag subtrees of context groups, `BeforeCursor` and `AfterCursor` with
/// their section.
pub fn section_transformer(
    node: &SnapshotNode,
    _parent: Option<&SnapshotNode>,
    mut context: WalkContext,
) -> WalkContext {
    match node.name() {
        name if is_context_component(name) => context.section = Some(SectionType::Context),
        BEFORE_CURSOR => context.section = Some(SectionType::Prefix),
        AFTER_CURSOR => context.section = Some(SectionType::Suffix),
        _ => {}
    }
    context
}

/// Number context groups in document order, starting at 0.
///
/// The counter lives in the returned transformer, so build a fresh one for
/// every walk.
pub fn context_index_transformer() -> Transformer {
    let next = Cell::new(0_usize);
    transformer(move |node, _parent, mut context| {
        if is_context_component(node.name()) {
            context.index = Some(next.get());
            next.set(next.get() + 1);
        }
        context
    })
}
