//! Error taxonomy for prompt construction, reconciliation, and rendering.
//!
//! Cancellation is deliberately absent: it is reported through the
//! `Cancelled` variants of the snapshot and render results, never as an error.

use thiserror::Error;

/// Errors raised while building, reconciling, or rendering a prompt tree.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    /// Two or more siblings declared the same explicit key.
    #[error("Duplicate keys found: {}", .0.join(", "))]
    DuplicateKeys(Vec<String>),

    /// The virtual tree is not available (never built, or its owner was dropped).
    #[error("Virtual prompt tree is not initialized")]
    Uninitialized,

    /// A required anchor component was not present in the snapshot.
    #[error("Node of type {0} not found")]
    NodeNotFound(String),

    /// More than one suffix block was produced by a snapshot.
    #[error("Only one suffix is allowed")]
    MultipleSuffixes,

    /// Token budget options cannot be satisfied.
    #[error("Invalid token budget: {0}")]
    InvalidBudget(String),

    /// A tokenizer name could not be resolved.
    #[error("Unknown tokenizer: {0}")]
    UnknownTokenizer(String),

    /// A known encoder failed to load its ranks.
    #[error("Tokenizer {name} could not be loaded: {reason}")]
    TokenizerUnavailable {
        /// Encoder name.
        name: String,
        /// Loader error message.
        reason: String,
    },
}

/// Result type for prompt operations.
pub type Result<T> = std::result::Result<T, PromptError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
