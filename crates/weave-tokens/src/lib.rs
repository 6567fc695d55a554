//! # weave-tokens
//!
//! Tokenization seam for the Weave prompt engine.
//!
//! Budgeting and elision only ever talk to the [`Tokenizer`] trait. The
//! builtin encoders are [`BpeTokenizer`]s over the `tiktoken-rs` ranks for
//! `o200k_base` and `cl100k_base`; other encoders plug in through a
//! [`TokenizerProvider`].
//!
//! # Key Types
//!
//! - [`Tokenizer`]: tokenize, count, and cut text on token boundaries
//! - [`BpeTokenizer`]: `tiktoken` encoders, loaded once per process
//! - [`TokenizerName`]: encoder names understood by render options
//! - [`TokenizerProvider`] / [`BuiltinTokenizers`]: name resolution
//! - [`edit_distance`]: Levenshtein distance over token sequences

#![deny(unsafe_code)]

pub mod bpe;
pub mod edit_distance;
pub mod provider;
pub mod types;

pub use bpe::BpeTokenizer;
pub use edit_distance::edit_distance;
pub use provider::{BuiltinTokenizers, TokenizerProvider, default_tokenizer};
pub use types::{TokenSlice, Tokenizer, TokenizerName};
