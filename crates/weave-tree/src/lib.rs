//! # weave-tree
//!
//! The reactive half of the Weave prompt engine.
//!
//! - **Elements**: [`Element`] (primitive, fragment, component) and the
//!   [`Component`] trait
//! - **Hooks**: [`Lifecycle`] with `use_state` and `use_data`, backed by
//!   per-path [`StateSlots`]
//! - **Reconciler**: builds the live [`VirtualNode`] tree, remounts changed
//!   components, garbage-collects state for vanished paths, and feeds data
//!   through [`Pipe`]s
//! - **VirtualPrompt**: the façade producing immutable [`SnapshotNode`]s
//! - **Walker**: [`SnapshotWalker`] folding [`Transformer`]s into a
//!   [`WalkContext`] per node (weight, chunks, source, section)
//! - **Components**: [`Text`] and [`Chunk`]

#![deny(unsafe_code)]

pub mod components;
pub mod element;
pub mod hooks;
pub mod prompt;
pub mod reconciler;
pub mod snapshot;
pub mod walker;

pub use components::{CHUNK_NAME, Chunk, Text, chunk, fragment, text, text_parts};
pub use element::{Component, Element, FnComponent, Key, Primitive, Props, component_fn};
pub use hooks::{Lifecycle, StateSetter, StateSlots, UseData, UseState};
pub use prompt::{SnapshotResult, SnapshotStatus, VirtualPrompt};
pub use reconciler::{FRAGMENT_NAME, LifecycleData, PRIMITIVE_NAME, Pipe, Reconciler, VirtualNode};
pub use snapshot::{NodeProps, NodeStatistics, SnapshotNode};
pub use walker::{
    SectionType, SnapshotWalker, Transformer, WalkContext, chunk_transformer,
    default_transformers, source_transformer, transformer, weight_transformer,
};
