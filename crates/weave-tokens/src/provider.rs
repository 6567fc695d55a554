//! Resolution of [`TokenizerName`]s to tokenizer instances.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use weave_core::Result;

use crate::bpe::BpeTokenizer;
use crate::types::{Tokenizer, TokenizerName};

/// Resolves tokenizer names for the renderer.
pub trait TokenizerProvider: Send + Sync {
    /// Tokenizer registered for `name`.
    fn tokenizer(&self, name: TokenizerName) -> Result<Arc<dyn Tokenizer>>;
}

/// Provider backed by a name → tokenizer table.
///
/// Names without an entry resolve to the [`BpeTokenizer`] of the same name;
/// [`BuiltinTokenizers::register`] overrides one.
#[derive(Default)]
pub struct BuiltinTokenizers {
    table: HashMap<TokenizerName, Arc<dyn Tokenizer>>,
}

impl BuiltinTokenizers {
    /// Provider with only the `tiktoken` encoders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tokenizer registered for its own name.
    pub fn register(&mut self, tokenizer: Arc<dyn Tokenizer>) {
        let name = tokenizer.name();
        debug!(tokenizer = %name, "registering tokenizer");
        let _ = self.table.insert(name, tokenizer);
    }
}

impl std::fmt::Debug for BuiltinTokenizers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinTokenizers")
            .field("names", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TokenizerProvider for BuiltinTokenizers {
    fn tokenizer(&self, name: TokenizerName) -> Result<Arc<dyn Tokenizer>> {
        match self.table.get(&name) {
            Some(tokenizer) => Ok(Arc::clone(tokenizer)),
            None => Ok(Arc::new(BpeTokenizer::load(name)?)),
        }
    }
}

/// The tokenizer used when callers do not supply one.
pub fn default_tokenizer() -> Result<Arc<dyn Tokenizer>> {
    Ok(Arc::new(BpeTokenizer::load(TokenizerName::default())?))
}
