//! BPE encoders backed by `tiktoken-rs`.
//!
//! The `o200k_base` and `cl100k_base` ranks ship inside `tiktoken-rs`, so
//! loading needs no network or model files. Each encoder is built at most
//! once per process and shared by every [`BpeTokenizer`] with its name.

use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

use tiktoken_rs::CoreBPE;
use tracing::{debug, trace};
use weave_core::{PromptError, Result};

use crate::types::{TokenSlice, Tokenizer, TokenizerName};

static O200K: OnceLock<CoreBPE> = OnceLock::new();
static CL100K: OnceLock<CoreBPE> = OnceLock::new();

/// Shared encoder for `name`, loading it on first use.
fn encoder(name: TokenizerName) -> Result<&'static CoreBPE> {
    let cell = match name {
        TokenizerName::O200k => &O200K,
        TokenizerName::Cl100k => &CL100K,
    };
    if let Some(bpe) = cell.get() {
        return Ok(bpe);
    }

    let started = Instant::now();
    let loaded = match name {
        TokenizerName::O200k => tiktoken_rs::o200k_base(),
        TokenizerName::Cl100k => tiktoken_rs::cl100k_base(),
    }
    .map_err(|err| PromptError::TokenizerUnavailable {
        name: name.to_string(),
        reason: err.to_string(),
    })?;
    debug!(
        tokenizer = %name,
        load_ms = started.elapsed().as_secs_f64() * 1000.0,
        "encoder loaded"
    );
    Ok(cell.get_or_init(|| loaded))
}

/// A `tiktoken` encoder behind the [`Tokenizer`] trait.
#[derive(Clone, Copy)]
pub struct BpeTokenizer {
    name: TokenizerName,
    bpe: &'static CoreBPE,
}

impl BpeTokenizer {
    /// Encoder for `name`.
    pub fn load(name: TokenizerName) -> Result<Self> {
        Ok(Self {
            name,
            bpe: encoder(name)?,
        })
    }

    /// Decode `tokens` if they end on a char boundary.
    fn decode(&self, tokens: &[u32]) -> Option<String> {
        self.bpe.decode(tokens.to_vec()).ok()
    }

    /// Keep `n` tokens from one end of `text`, backing off while the cut
    /// would split a multi-byte char.
    fn cut(&self, text: &str, n: usize, from_end: bool) -> TokenSlice {
        let tokens = self.tokenize(text);
        if tokens.len() <= n {
            return TokenSlice {
                text: text.to_string(),
                tokens,
            };
        }

        for keep in (0..=n).rev() {
            let window = if from_end {
                &tokens[tokens.len() - keep..]
            } else {
                &tokens[..keep]
            };
            let Some(decoded) = self.decode(window) else {
                continue;
            };
            let fits = if from_end {
                text.ends_with(&decoded)
            } else {
                text.starts_with(&decoded)
            };
            if fits {
                if keep < n {
                    trace!(tokenizer = %self.name, wanted = n, kept = keep, "cut moved to char boundary");
                }
                return TokenSlice {
                    text: decoded,
                    tokens: window.to_vec(),
                };
            }
        }
        TokenSlice::default()
    }
}

impl fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BpeTokenizer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Tokenizer for BpeTokenizer {
    fn name(&self) -> TokenizerName {
        self.name
    }

    fn tokenize(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }

    fn take_first_tokens(&self, text: &str, n: usize) -> TokenSlice {
        self.cut(text, n, false)
    }

    fn take_last_tokens(&self, text: &str, n: usize) -> TokenSlice {
        self.cut(text, n, true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
