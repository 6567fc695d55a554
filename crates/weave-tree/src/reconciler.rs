//! Reconciler: turns elements into a persistent, stateful node tree.
//!
//! Identity is structural. Every node has a path built from its parent's
//! path, its sibling position (or explicit key) and its type name:
//!
//! - root fragment: `$.f`, root component: `$.Name`
//! - component child: `<parent>[i].Name` or `<parent>["key"].Name`
//! - fragment child: `<parent>[i].f`
//! - primitive child: `<parent>[i]`
//!
//! State lives in a [`LifecycleData`] map keyed by path. A component whose
//! state changed is remounted in place; lifecycle entries for descendant
//! paths that vanish during a remount are dropped.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};
use weave_core::{CancellationToken, PromptError, Result, is_cancelled};

use crate::element::{Component, Element, Key, Props};
use crate::hooks::{Lifecycle, StateSlots, UseData, UseState};
use crate::snapshot::{NodeProps, SnapshotNode, freeze};

/// Name given to fragment nodes.
pub const FRAGMENT_NAME: &str = "f";
/// Name given to primitive leaf nodes.
pub const PRIMITIVE_NAME: &str = "#text";

/// State persisted for one component path across remounts.
#[derive(Clone, Debug, Default)]
pub struct LifecycleData {
    state: StateSlots,
    update_data_time_ms: Rc<Cell<f64>>,
}

impl LifecycleData {
    fn lifecycle(&self) -> Lifecycle {
        let timer = Rc::clone(&self.update_data_time_ms);
        Lifecycle::new(
            UseState::new(self.state.clone()),
            UseData::new(move |ms| timer.set(timer.get() + ms)),
        )
    }
}

struct Mount {
    component: Rc<dyn Component>,
    props: Props,
    lifecycle: Lifecycle,
    data: LifecycleData,
}

/// A live node of the virtual tree.
pub struct VirtualNode {
    name: String,
    path: String,
    props: NodeProps,
    value: Option<String>,
    children: Vec<VirtualNode>,
    mount: Option<Mount>,
}

impl VirtualNode {
    /// Component name, [`FRAGMENT_NAME`] or [`PRIMITIVE_NAME`].
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Props that survive into snapshots.
    #[must_use]
    pub fn props(&self) -> &NodeProps {
        &self.props
    }

    /// Leaf text for primitive nodes.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Children in document order.
    #[must_use]
    pub fn children(&self) -> &[VirtualNode] {
        &self.children
    }

    /// Whether this node's state changed since it was last mounted.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.mount.as_ref().is_some_and(|m| m.lifecycle.has_changed())
    }

    /// Time spent in data hooks since the last completed snapshot.
    pub(crate) fn update_data_time_ms(&self) -> f64 {
        self.mount
            .as_ref()
            .map_or(0.0, |m| m.data.update_data_time_ms.get())
    }

    fn leaf(path: String, value: String) -> Self {
        Self {
            name: PRIMITIVE_NAME.to_string(),
            path,
            props: NodeProps::default(),
            value: Some(value),
            children: Vec::new(),
            mount: None,
        }
    }
}

impl std::fmt::Debug for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualNode")
            .field("path", &self.path)
            .field("value", &self.value)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

type SharedTree = Rc<RefCell<Option<VirtualNode>>>;

/// Owns the live tree and the per-path lifecycle map.
pub struct Reconciler {
    tree: SharedTree,
    lifecycle: HashMap<String, LifecycleData>,
}

impl Reconciler {
    /// Virtualize `root` into a fresh tree.
    pub fn new(root: Element) -> Result<Self> {
        let mut lifecycle = HashMap::new();
        let tree = virtualize(root, "$", None, &mut lifecycle)?;
        debug!(paths = lifecycle.len(), "virtual tree built");
        Ok(Self {
            tree: Rc::new(RefCell::new(Some(tree))),
            lifecycle,
        })
    }

    /// Remount every node whose state changed; leave the rest in place.
    pub fn reconcile(&mut self, cancel: Option<&CancellationToken>) -> Result<()> {
        if is_cancelled(cancel) {
            debug!("reconcile skipped, cancelled");
            return Ok(());
        }
        let mut tree = self.tree.borrow_mut();
        let root = tree.as_mut().ok_or(PromptError::Uninitialized)?;
        reconcile_node(root, &mut self.lifecycle)
    }

    /// A pipe pumping data into this tree's data hooks.
    pub fn create_pipe(&self) -> Pipe {
        Pipe {
            tree: Rc::downgrade(&self.tree),
        }
    }

    /// Run `f` against the current root.
    pub fn with_tree<R>(&self, f: impl FnOnce(&VirtualNode) -> R) -> Result<R> {
        let tree = self.tree.borrow();
        let root = tree.as_ref().ok_or(PromptError::Uninitialized)?;
        Ok(f(root))
    }

    /// Whether lifecycle data is held for `path`.
    #[must_use]
    pub fn has_lifecycle(&self, path: &str) -> bool {
        self.lifecycle.contains_key(path)
    }

    /// Number of paths holding lifecycle data.
    #[must_use]
    pub fn lifecycle_len(&self) -> usize {
        self.lifecycle.len()
    }

    /// Freeze the current tree. `Ok(None)` means cancelled.
    pub(crate) fn freeze(&self, cancel: Option<&CancellationToken>) -> Result<Option<SnapshotNode>> {
        self.freeze_until(&|| is_cancelled(cancel))
    }

    /// Freeze, then reset data-update timers. A cancelled freeze leaves the
    /// timers for the next snapshot.
    fn freeze_until(&self, cancelled: &dyn Fn() -> bool) -> Result<Option<SnapshotNode>> {
        self.with_tree(|root| {
            let snapshot = freeze(root, cancelled)?;
            reset_update_timers(root);
            Some(snapshot)
        })
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("lifecycle_paths", &self.lifecycle.len())
            .finish_non_exhaustive()
    }
}

/// Pushes external data into the data hooks of a tree.
///
/// Holds a weak reference: pumping after the owning reconciler is dropped
/// fails with [`PromptError::Uninitialized`].
#[derive(Clone, Debug)]
pub struct Pipe {
    tree: Weak<RefCell<Option<VirtualNode>>>,
}

impl Pipe {
    /// Offer `data` to every node's data hook in pre-order, awaiting each
    /// matching consumer in turn.
    pub async fn pump<T: Any>(&self, data: T) -> Result<()> {
        let hooks = {
            let tree = self.tree.upgrade().ok_or(PromptError::Uninitialized)?;
            let tree = tree.borrow();
            let root = tree.as_ref().ok_or(PromptError::Uninitialized)?;
            let mut hooks = Vec::new();
            collect_data_hooks(root, &mut hooks);
            hooks
        };
        trace!(hooks = hooks.len(), payload = std::any::type_name::<T>(), "pumping data");

        let payload: Rc<dyn Any> = Rc::new(data);
        for hook in hooks {
            hook.update_data(Rc::clone(&payload)).await;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Virtualization
// ─────────────────────────────────────────────────────────────────────────────

fn slot_path(parent: &str, index: Option<usize>, key: Option<&Key>) -> String {
    match (key, index) {
        (Some(key), _) => format!("{parent}[\"{key}\"]"),
        (None, Some(index)) => format!("{parent}[{index}]"),
        (None, None) => parent.to_string(),
    }
}

fn virtualize(
    element: Element,
    parent: &str,
    index: Option<usize>,
    lifecycle: &mut HashMap<String, LifecycleData>,
) -> Result<VirtualNode> {
    match element {
        Element::Primitive(primitive) => Ok(VirtualNode::leaf(
            slot_path(parent, index, None),
            primitive.to_string(),
        )),
        Element::Fragment(children) => {
            let path = format!("{}.{FRAGMENT_NAME}", slot_path(parent, index, None));
            let children = virtualize_children(children, &path, lifecycle)?;
            Ok(VirtualNode {
                name: FRAGMENT_NAME.to_string(),
                path,
                props: NodeProps::default(),
                value: None,
                children,
                mount: None,
            })
        }
        Element::Component { component, props } => {
            let path = format!(
                "{}.{}",
                slot_path(parent, index, props.key.as_ref()),
                component.name()
            );
            mount(path, component, props, lifecycle)
        }
    }
}

fn mount(
    path: String,
    component: Rc<dyn Component>,
    props: Props,
    lifecycle: &mut HashMap<String, LifecycleData>,
) -> Result<VirtualNode> {
    let data = lifecycle.entry(path.clone()).or_default().clone();
    let mut hooks = data.lifecycle();
    let rendered = component.render(&props, &mut hooks);
    trace!(path = %path, children = rendered.len(), "rendered component");
    let children = virtualize_children(rendered, &path, lifecycle)?;

    Ok(VirtualNode {
        name: component.name().to_string(),
        props: NodeProps::from(&props),
        path,
        value: None,
        children,
        mount: Some(Mount {
            component,
            props,
            lifecycle: hooks,
            data,
        }),
    })
}

fn virtualize_children(
    children: Vec<Element>,
    parent: &str,
    lifecycle: &mut HashMap<String, LifecycleData>,
) -> Result<Vec<VirtualNode>> {
    ensure_unique_keys(&children)?;
    children
        .into_iter()
        .enumerate()
        .map(|(i, child)| virtualize(child, parent, Some(i), lifecycle))
        .collect()
}

fn ensure_unique_keys(children: &[Element]) -> Result<()> {
    let mut counts: HashMap<&Key, usize> = HashMap::new();
    let mut order: Vec<&Key> = Vec::new();
    for key in children.iter().filter_map(Element::key) {
        let count = counts.entry(key).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    let duplicates: Vec<String> = order
        .into_iter()
        .filter(|key| counts.get(key).copied().unwrap_or(0) > 1)
        .map(ToString::to_string)
        .collect();
    if duplicates.is_empty() {
        Ok(())
    } else {
        warn!(keys = ?duplicates, "duplicate sibling keys");
        Err(PromptError::DuplicateKeys(duplicates))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reconciliation
// ─────────────────────────────────────────────────────────────────────────────

fn reconcile_node(node: &mut VirtualNode, lifecycle: &mut HashMap<String, LifecycleData>) -> Result<()> {
    if node.has_changed() {
        return remount(node, lifecycle);
    }
    for child in &mut node.children {
        reconcile_node(child, lifecycle)?;
    }
    Ok(())
}

fn remount(node: &mut VirtualNode, lifecycle: &mut HashMap<String, LifecycleData>) -> Result<()> {
    let Some(current) = node.mount.as_ref() else {
        return Ok(());
    };
    let fresh = mount(
        node.path.clone(),
        Rc::clone(&current.component),
        current.props.clone(),
        lifecycle,
    )?;

    let mut before = HashSet::new();
    collect_mounted_descendants(node, &mut before);
    let mut after = HashSet::new();
    collect_mounted_descendants(&fresh, &mut after);

    let mut removed = 0_usize;
    for stale in before.difference(&after) {
        if lifecycle.remove(stale.as_str()).is_some() {
            removed += 1;
        }
    }
    debug!(path = %node.path, removed, "remounted component");

    *node = fresh;
    Ok(())
}

fn collect_mounted_descendants(node: &VirtualNode, paths: &mut HashSet<String>) {
    for child in &node.children {
        if child.mount.is_some() {
            let _ = paths.insert(child.path.clone());
        }
        collect_mounted_descendants(child, paths);
    }
}

fn reset_update_timers(node: &VirtualNode) {
    if let Some(mount) = &node.mount {
        mount.data.update_data_time_ms.set(0.0);
    }
    for child in &node.children {
        reset_update_timers(child);
    }
}

fn collect_data_hooks(node: &VirtualNode, hooks: &mut Vec<UseData>) {
    if let Some(mount) = &node.mount {
        let data = mount.lifecycle.data();
        if data.consumer_count() > 0 {
            hooks.push(data.clone());
        }
    }
    for child in &node.children {
        collect_data_hooks(child, hooks);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
