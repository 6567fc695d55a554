//! # weave-render
//!
//! Turns prompt snapshots into completion prompts.
//!
//! - **Components**: [`CurrentFile`] splits a document at the cursor into
//!   [`BeforeCursor`] and [`AfterCursor`]; [`CompletionsContext`] and
//!   [`AdditionalCompletionsContext`] mark context
//! - **Request data**: [`CompletionRequestData`] pumped through a pipe
//! - **Budgeting**: [`TokenBudget`] splits the limit between prefix and suffix
//! - **Elision**: [`ElisionStrategy`] with the default [`WishlistElision`]
//! - **Rendering**: [`PromptRenderer`] in the combined or split-context
//!   [`PromptLayout`]

#![deny(unsafe_code)]

pub mod block;
pub mod budget;
pub mod comments;
pub mod completions;
pub mod constants;
pub mod document;
pub mod elision;
pub mod renderer;
pub mod request;
pub mod transformers;
pub mod types;

pub use block::{Block, ElidedBlock};
pub use budget::TokenBudget;
pub use comments::{CommentMarker, comment_lines, comment_marker};
pub use completions::{
    AdditionalCompletionsContext, AfterCursor, BeforeCursor, CompletionsContext, CurrentFile,
    additional_completions_context, completions_context, current_file,
};
pub use document::{Document, Position};
pub use elision::{ElisionResult, ElisionStrategy, WishlistElision};
pub use renderer::{PromptLayout, PromptRenderer};
pub use request::CompletionRequestData;
pub use transformers::{context_index_transformer, section_transformer};
pub use types::{
    ComponentStatistics, RenderMetadata, RenderOptions, RenderResult, RenderStatus, RenderedPrompt,
};
