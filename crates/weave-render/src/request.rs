//! Data pumped into completion prompts.

use std::sync::Arc;

use weave_settings::CompletionSettings;
use weave_tokens::Tokenizer;

use crate::document::{Document, Position};

/// A completion request: the document, where the cursor is, and how the
/// suffix cache should compare suffixes.
///
/// Fields are read through accessors so the cursor offset stays on a char
/// boundary of the document text.
#[derive(Clone, Debug)]
pub struct CompletionRequestData {
    document: Document,
    offset: usize,
    suffix_match_threshold: Option<u32>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl CompletionRequestData {
    /// Request with the cursor at byte `offset`, clamped into the text and
    /// back onto a char boundary.
    pub fn new(document: Document, offset: usize) -> Self {
        let offset = document.clamp_offset(offset);
        Self {
            document,
            offset,
            suffix_match_threshold: None,
            tokenizer: None,
        }
    }

    /// Request with the cursor at `position`.
    pub fn at_position(document: Document, position: Position) -> Self {
        let offset = document.offset_at(position);
        Self::new(document, offset)
    }

    /// Set the suffix cache threshold.
    #[must_use]
    pub fn with_suffix_match_threshold(mut self, threshold: u32) -> Self {
        self.suffix_match_threshold = Some(threshold);
        self
    }

    /// Take the suffix cache threshold from settings.
    #[must_use]
    pub fn with_settings(self, settings: &CompletionSettings) -> Self {
        self.with_suffix_match_threshold(settings.suffix_match_threshold)
    }

    /// Set the tokenizer the suffix cache compares with.
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Document being edited.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Cursor byte offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Suffix cache threshold; the component default applies when `None`.
    #[must_use]
    pub fn suffix_match_threshold(&self) -> Option<u32> {
        self.suffix_match_threshold
    }

    /// Tokenizer for the suffix cache; the default encoder applies when `None`.
    #[must_use]
    pub fn tokenizer(&self) -> Option<&Arc<dyn Tokenizer>> {
        self.tokenizer.as_ref()
    }

    /// Cursor position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.document.position_at(self.offset)
    }

    /// Text before the cursor.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.document.text[..self.offset]
    }

    /// Text from the cursor on.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.document.text[self.offset..]
    }
}
