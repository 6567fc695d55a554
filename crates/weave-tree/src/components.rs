//! Base components: [`Text`] and [`Chunk`].

use tracing::trace;

use crate::element::{Component, Element, Props};
use crate::hooks::Lifecycle;

/// Name the chunk transformer looks for.
pub const CHUNK_NAME: &str = "Chunk";

/// Concatenates its primitive children into a single text leaf.
#[derive(Clone, Copy, Debug, Default)]
pub struct Text;

impl Component for Text {
    fn name(&self) -> &str {
        "Text"
    }

    fn render(&self, props: &Props, _lifecycle: &mut Lifecycle) -> Vec<Element> {
        let mut joined = String::new();
        for child in &props.children {
            match child {
                Element::Primitive(primitive) => joined.push_str(&primitive.to_string()),
                other => trace!(child = ?other, "Text ignores non-primitive child"),
            }
        }
        if joined.is_empty() {
            Vec::new()
        } else {
            vec![Element::text(joined)]
        }
    }
}

/// Groups children so that elision keeps or drops them together.
#[derive(Clone, Copy, Debug, Default)]
pub struct Chunk;

impl Component for Chunk {
    fn name(&self) -> &str {
        CHUNK_NAME
    }

    fn render(&self, props: &Props, _lifecycle: &mut Lifecycle) -> Vec<Element> {
        props.children.clone()
    }
}

/// `Text` holding a single string.
pub fn text(value: impl Into<String>) -> Element {
    Element::component(Text, Props::new().with_children([Element::text(value)]))
}

/// `Text` concatenating several primitives, e.g. `["n = ", 1]`.
pub fn text_parts(parts: impl IntoIterator<Item = Element>) -> Element {
    Element::component(Text, Props::new().with_children(parts))
}

/// `Chunk` around `children`.
pub fn chunk(children: impl IntoIterator<Item = Element>) -> Element {
    Element::component(Chunk, Props::new().with_children(children))
}

/// Fragment around `children`.
pub fn fragment(children: impl IntoIterator<Item = Element>) -> Element {
    Element::fragment(children)
}
