//! Completion components.
//!
//! [`CurrentFile`] listens for [`CompletionRequestData`] and splits the
//! document at the cursor into a [`BeforeCursor`] (the prefix anchor) and
//! an [`AfterCursor`] (the suffix). `AfterCursor` keeps a cached suffix and
//! keeps rendering it while the text after the cursor stays similar, so
//! small edits below the cursor do not churn the prompt.
//!
//! [`CompletionsContext`] and [`AdditionalCompletionsContext`] mark their
//! subtrees as context.

use std::sync::Arc;

use tracing::{trace, warn};
use weave_tokens::{Tokenizer, default_tokenizer, edit_distance};
use weave_tree::{Component, Element, Lifecycle, Props, text};

use crate::constants::{
    ADDITIONAL_COMPLETIONS_CONTEXT, AFTER_CURSOR, BEFORE_CURSOR, COMPLETIONS_CONTEXT,
    CURRENT_FILE, DEFAULT_SUFFIX_MATCH_THRESHOLD, SUFFIX_COMPARE_TOKENS,
};
use crate::request::CompletionRequestData;

// =============================================================================
// Context groups
// =============================================================================

/// Primary context group. Renders its children unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompletionsContext;

impl Component for CompletionsContext {
    fn name(&self) -> &str {
        COMPLETIONS_CONTEXT
    }

    fn render(&self, props: &Props, _lifecycle: &mut Lifecycle) -> Vec<Element> {
        props.children.clone()
    }
}

/// Secondary context group. Renders its children unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdditionalCompletionsContext;

impl Component for AdditionalCompletionsContext {
    fn name(&self) -> &str {
        ADDITIONAL_COMPLETIONS_CONTEXT
    }

    fn render(&self, props: &Props, _lifecycle: &mut Lifecycle) -> Vec<Element> {
        props.children.clone()
    }
}

/// `CompletionsContext` around `children`.
pub fn completions_context(children: impl IntoIterator<Item = Element>) -> Element {
    Element::component(CompletionsContext, Props::new().with_children(children))
}

/// `AdditionalCompletionsContext` around `children`.
pub fn additional_completions_context(children: impl IntoIterator<Item = Element>) -> Element {
    Element::component(
        AdditionalCompletionsContext,
        Props::new().with_children(children),
    )
}

// =============================================================================
// Current file
// =============================================================================

/// What `CurrentFile` remembers from the last request.
///
/// `offset` is on a char boundary of `text`.
#[derive(Clone, Debug)]
struct Cursor {
    uri: String,
    text: String,
    offset: usize,
    threshold: u32,
    tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl Cursor {
    fn prefix(&self) -> &str {
        &self.text[..self.offset]
    }

    fn suffix(&self) -> &str {
        &self.text[self.offset..]
    }
}

impl From<&CompletionRequestData> for Cursor {
    fn from(request: &CompletionRequestData) -> Self {
        let document = request.document();
        Self {
            uri: document.uri.clone(),
            text: document.text.clone(),
            offset: document.clamp_offset(request.offset()),
            threshold: request
                .suffix_match_threshold()
                .unwrap_or(DEFAULT_SUFFIX_MATCH_THRESHOLD),
            tokenizer: request.tokenizer().cloned(),
        }
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
            && self.offset == other.offset
            && self.threshold == other.threshold
            && self.tokenizer.as_ref().map(|t| t.name()) == other.tokenizer.as_ref().map(|t| t.name())
            && self.text == other.text
    }
}

/// Splits the requested document at the cursor.
///
/// Before any request arrives it still renders an empty `BeforeCursor`, so
/// the tree always has a prefix anchor.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentFile;

impl Component for CurrentFile {
    fn name(&self) -> &str {
        CURRENT_FILE
    }

    fn render(&self, _props: &Props, lifecycle: &mut Lifecycle) -> Vec<Element> {
        let (cursor, set_cursor) = lifecycle.use_state::<Option<Cursor>>(None);
        let current = cursor.clone();
        lifecycle.use_data(move |request: &CompletionRequestData| {
            let next = Cursor::from(request);
            if current.as_ref() != Some(&next) {
                trace!(uri = %next.uri, offset = next.offset, "cursor moved");
                set_cursor.set(Some(next));
            }
        });

        let (before, after) = match cursor {
            Some(cursor) => {
                let mut after = AfterCursor::new(cursor.suffix()).with_threshold(cursor.threshold);
                if let Some(tokenizer) = cursor.tokenizer.clone() {
                    after = after.with_tokenizer(tokenizer);
                }
                (BeforeCursor::new(cursor.prefix()), after)
            }
            None => (BeforeCursor::default(), AfterCursor::default()),
        };
        vec![Element::fragment([Element::of(before), Element::of(after)])]
    }
}

/// `CurrentFile` element.
pub fn current_file() -> Element {
    Element::of(CurrentFile)
}

// =============================================================================
// Cursor halves
// =============================================================================

/// Text before the cursor, rendered verbatim.
#[derive(Clone, Debug, Default)]
pub struct BeforeCursor {
    text: String,
}

impl BeforeCursor {
    /// Prefix component for `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Component for BeforeCursor {
    fn name(&self) -> &str {
        BEFORE_CURSOR
    }

    fn render(&self, _props: &Props, _lifecycle: &mut Lifecycle) -> Vec<Element> {
        vec![text(self.text.as_str())]
    }
}

/// Text after the cursor line, with a similarity cache.
///
/// Without an explicit tokenizer the cache compares with the default encoder.
#[derive(Clone, Debug)]
pub struct AfterCursor {
    text: Option<String>,
    threshold: u32,
    tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl Default for AfterCursor {
    fn default() -> Self {
        Self {
            text: None,
            threshold: DEFAULT_SUFFIX_MATCH_THRESHOLD,
            tokenizer: None,
        }
    }
}

impl AfterCursor {
    /// Suffix component for the raw text from the cursor on.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Set the edit-distance threshold, in percent.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the tokenizer used for the similarity check.
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Whether `trimmed` is close enough to `cached` to keep rendering `cached`.
    fn reuses_cached(&self, cached: &str, trimmed: &str) -> bool {
        if cached.is_empty() {
            return false;
        }
        let tokenizer = match &self.tokenizer {
            Some(tokenizer) => Arc::clone(tokenizer),
            None => match default_tokenizer() {
                Ok(tokenizer) => tokenizer,
                Err(err) => {
                    warn!(error = %err, "suffix cache disabled");
                    return false;
                }
            },
        };
        suffix_matches(cached, trimmed, self.threshold, tokenizer.as_ref())
    }
}

impl Component for AfterCursor {
    fn name(&self) -> &str {
        AFTER_CURSOR
    }

    fn render(&self, _props: &Props, lifecycle: &mut Lifecycle) -> Vec<Element> {
        let (cached, set_cached) = lifecycle.use_state(String::new());
        let Some(raw) = self.text.as_deref() else {
            return vec![text("")];
        };

        let trimmed = suffix_after_cursor_line(raw);
        if trimmed == cached {
            return vec![text(cached)];
        }

        if self.reuses_cached(&cached, trimmed) {
            trace!("suffix close to cached, reusing");
            return vec![text(cached)];
        }
        // rendered below, so stored without a remount
        set_cached.store(trimmed.to_string());
        vec![text(trimmed)]
    }
}

/// Drop the rest of the cursor line, then leading whitespace.
pub fn suffix_after_cursor_line(raw: &str) -> &str {
    match raw.find(['\n', '\r']) {
        Some(idx) => raw[idx..].trim_start(),
        None => "",
    }
}

/// Whether `candidate` is close enough to `cached` to keep `cached`.
///
/// Compares the leading [`SUFFIX_COMPARE_TOKENS`] tokens of each: the
/// suffixes match when the edit distance is under `threshold` percent of
/// the candidate's compared length.
pub fn suffix_matches(cached: &str, candidate: &str, threshold: u32, tokenizer: &dyn Tokenizer) -> bool {
    let candidate_tokens = tokenizer.take_first_tokens(candidate, SUFFIX_COMPARE_TOKENS).tokens;
    let cached_tokens = tokenizer.take_first_tokens(cached, SUFFIX_COMPARE_TOKENS).tokens;
    let distance = edit_distance(&cached_tokens, &candidate_tokens);
    100 * distance < threshold as usize * candidate_tokens.len()
}
