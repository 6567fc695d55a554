//! Declarative elements and the component trait.
//!
//! An [`Element`] is the ephemeral description of what a component wants to
//! render on this pass. Dispatch is resolved once, at construction time, into
//! one of three variants: a primitive leaf, a fragment, or a component with
//! its props. The reconciler turns elements into persistent nodes.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hooks::Lifecycle;

/// Explicit sibling identity. Overrides positional identity when present.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Self(value.to_string())
    }
}

/// Props shared by every component.
///
/// Component-specific data lives in the component value itself; these are
/// the fields the reconciler and walker understand.
#[derive(Clone, Default)]
pub struct Props {
    /// Elements passed between the component's tags.
    pub children: Vec<Element>,
    /// Explicit sibling key.
    pub key: Option<Key>,
    /// Declared weight. Clamped to `[0, 1]` when walked.
    pub weight: Option<f64>,
    /// Arbitrary provenance attached to the subtree's statistics.
    pub source: Option<Value>,
}

impl Props {
    /// Empty props.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the children.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    /// Set the key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Set the source.
    #[must_use]
    pub fn with_source(mut self, source: Value) -> Self {
        self.source = Some(source);
        self
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("children", &self.children.len())
            .field("key", &self.key)
            .field("weight", &self.weight)
            .field("source", &self.source)
            .finish()
    }
}

/// A prompt component.
///
/// `render` is invoked on mount and on every remount. Hooks must be called
/// unconditionally and in the same order on every invocation: slots are
/// matched by call order, not by name.
pub trait Component: 'static {
    /// Type name used in node paths (`$.f[0].<name>`).
    fn name(&self) -> &str;

    /// Produce this component's children.
    fn render(&self, props: &Props, lifecycle: &mut Lifecycle) -> Vec<Element>;
}

/// Primitive leaf content.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    /// A string.
    Text(String),
    /// A number, rendered without a trailing `.0` for integral values.
    Number(f64),
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Declarative description of one tree position.
#[derive(Clone)]
pub enum Element {
    /// String or number leaf.
    Primitive(Primitive),
    /// Transparent grouping of children.
    Fragment(Vec<Element>),
    /// A component invocation.
    Component {
        /// The component to invoke.
        component: Rc<dyn Component>,
        /// Props passed to it.
        props: Props,
    },
}

impl Element {
    /// A string leaf.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Primitive(Primitive::Text(value.into()))
    }

    /// A numeric leaf.
    pub fn number(value: impl Into<f64>) -> Self {
        Self::Primitive(Primitive::Number(value.into()))
    }

    /// A fragment of children.
    pub fn fragment(children: impl IntoIterator<Item = Element>) -> Self {
        Self::Fragment(children.into_iter().collect())
    }

    /// Invoke `component` with `props`.
    pub fn component(component: impl Component, props: Props) -> Self {
        Self::Component {
            component: Rc::new(component),
            props,
        }
    }

    /// Invoke `component` with empty props.
    pub fn of(component: impl Component) -> Self {
        Self::component(component, Props::new())
    }

    /// Set the key of a component element. No-op for other variants.
    #[must_use]
    pub fn with_key(self, key: impl Into<Key>) -> Self {
        self.map_props(|props| props.with_key(key))
    }

    /// Set the weight of a component element. No-op for other variants.
    #[must_use]
    pub fn with_weight(self, weight: f64) -> Self {
        self.map_props(|props| props.with_weight(weight))
    }

    /// Set the source of a component element. No-op for other variants.
    #[must_use]
    pub fn with_source(self, source: Value) -> Self {
        self.map_props(|props| props.with_source(source))
    }

    /// Set the children of a component element. No-op for other variants.
    #[must_use]
    pub fn with_children(self, children: impl IntoIterator<Item = Element>) -> Self {
        self.map_props(|props| props.with_children(children))
    }

    /// Explicit key, if this is a keyed component element.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Self::Component { props, .. } => props.key.as_ref(),
            _ => None,
        }
    }

    fn map_props(self, f: impl FnOnce(Props) -> Props) -> Self {
        match self {
            Self::Component { component, props } => Self::Component {
                component,
                props: f(props),
            },
            other => other,
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => f.debug_tuple("Primitive").field(p).finish(),
            Self::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Self::Component { component, props } => f
                .debug_struct("Component")
                .field("name", &component.name())
                .field("props", props)
                .finish(),
        }
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<i32> for Element {
    fn from(value: i32) -> Self {
        Self::number(value)
    }
}

/// A component backed by a closure.
pub struct FnComponent<F> {
    name: String,
    render: F,
}

impl<F> Component for FnComponent<F>
where
    F: Fn(&Props, &mut Lifecycle) -> Vec<Element> + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, props: &Props, lifecycle: &mut Lifecycle) -> Vec<Element> {
        (self.render)(props, lifecycle)
    }
}

/// Wrap a closure as a named component.
pub fn component_fn<F>(name: impl Into<String>, render: F) -> FnComponent<F>
where
    F: Fn(&Props, &mut Lifecycle) -> Vec<Element> + 'static,
{
    FnComponent {
        name: name.into(),
        render,
    }
}
