//! Tokenizer trait and shared token types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use weave_core::PromptError;

/// Encoder names accepted in render options and settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerName {
    /// `o200k_base` family.
    #[default]
    O200k,
    /// `cl100k_base` family.
    Cl100k,
}

impl TokenizerName {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::O200k => "o200k",
            Self::Cl100k => "cl100k",
        }
    }
}

impl fmt::Display for TokenizerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenizerName {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "o200k" | "o200k_base" => Ok(Self::O200k),
            "cl100k" | "cl100k_base" => Ok(Self::Cl100k),
            other => Err(PromptError::UnknownTokenizer(other.to_string())),
        }
    }
}

/// A prefix or suffix of some text cut on a token boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenSlice {
    /// The retained text.
    pub text: String,
    /// Token ids of `text`.
    pub tokens: Vec<u32>,
}

impl TokenSlice {
    /// Number of retained tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether nothing was retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Tokenizer used for budgeting, elision and suffix similarity.
///
/// Implementations must be deterministic: the same text always yields the
/// same ids, and cutting never splits a token.
pub trait Tokenizer: Send + Sync + fmt::Debug {
    /// Encoder this tokenizer stands in for.
    fn name(&self) -> TokenizerName;

    /// Encode `text` into token ids.
    fn tokenize(&self, text: &str) -> Vec<u32>;

    /// Number of tokens in `text`.
    fn token_length(&self, text: &str) -> usize {
        self.tokenize(text).len()
    }

    /// Keep at most the first `n` tokens of `text`.
    fn take_first_tokens(&self, text: &str, n: usize) -> TokenSlice;

    /// Keep at most the last `n` tokens of `text`.
    fn take_last_tokens(&self, text: &str, n: usize) -> TokenSlice;
}
