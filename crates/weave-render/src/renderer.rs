//! [`PromptRenderer`]: snapshot in, prompt strings out.
//!
//! A render walks the snapshot once to turn non-empty leaves into
//! [`Block`]s, splits the token limit, runs the elision strategy, and
//! assembles the surviving text for the configured [`PromptLayout`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::{debug, warn};
use weave_core::text::{ensure_trailing, is_shebang, normalize_line_endings, strip_trailing};
use weave_core::{CancellationToken, PromptError, Result, is_cancelled};
use weave_tokens::{BuiltinTokenizers, TokenizerProvider};
use weave_tree::{SectionType, SnapshotNode, SnapshotWalker, WalkContext, default_transformers, transformer};

use crate::block::{Block, ElidedBlock};
use crate::budget::TokenBudget;
use crate::comments::comment_lines;
use crate::constants::BEFORE_CURSOR;
use crate::elision::{ElisionResult, ElisionStrategy, WishlistElision};
use crate::transformers::{context_index_transformer, section_transformer};
use crate::types::{ComponentStatistics, RenderMetadata, RenderOptions, RenderResult, RenderedPrompt};

/// Where context ends up in the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PromptLayout {
    /// Context is commented out and folded into the prefix.
    #[default]
    Combined,
    /// Context is returned separately, one entry per context group.
    SplitContext,
}

/// Renders snapshots into prompts.
pub struct PromptRenderer {
    layout: PromptLayout,
    elision: Box<dyn ElisionStrategy>,
    tokenizers: Arc<dyn TokenizerProvider>,
    next_render_id: AtomicU64,
}

impl std::fmt::Debug for PromptRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRenderer")
            .field("layout", &self.layout)
            .field("elision", &self.elision)
            .field("next_render_id", &self.next_render_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl PromptRenderer {
    /// Renderer with wishlist elision and the builtin tokenizers.
    pub fn new(layout: PromptLayout) -> Self {
        Self {
            layout,
            elision: Box::new(WishlistElision),
            tokenizers: Arc::new(BuiltinTokenizers::new()),
            next_render_id: AtomicU64::new(0),
        }
    }

    /// Combined layout.
    pub fn completions() -> Self {
        Self::new(PromptLayout::Combined)
    }

    /// Split-context layout.
    pub fn split_context() -> Self {
        Self::new(PromptLayout::SplitContext)
    }

    /// Replace the elision strategy.
    #[must_use]
    pub fn with_elision(mut self, strategy: impl ElisionStrategy + 'static) -> Self {
        self.elision = Box::new(strategy);
        self
    }

    /// Replace the tokenizer provider.
    #[must_use]
    pub fn with_tokenizers(mut self, provider: Arc<dyn TokenizerProvider>) -> Self {
        self.tokenizers = provider;
        self
    }

    /// Configured layout.
    #[must_use]
    pub fn layout(&self) -> PromptLayout {
        self.layout
    }

    /// Render `snapshot`. Errors and cancellation come back as
    /// [`RenderResult`] variants.
    pub fn render(
        &self,
        snapshot: &SnapshotNode,
        options: &RenderOptions,
        cancel: Option<&CancellationToken>,
    ) -> RenderResult {
        if is_cancelled(cancel) {
            debug!("render cancelled");
            return RenderResult::Cancelled;
        }
        let render_id = self.next_render_id.fetch_add(1, Ordering::Relaxed);
        match self.try_render(snapshot, options, render_id) {
            Ok(prompt) => {
                debug!(
                    render_id,
                    prefix_tokens = prompt.prefix_tokens,
                    suffix_tokens = prompt.suffix_tokens,
                    render_ms = prompt.metadata.render_time_ms,
                    "prompt rendered"
                );
                RenderResult::Ok(prompt)
            }
            Err(err) => {
                warn!(render_id, error = %err, "render failed");
                RenderResult::Error(err)
            }
        }
    }

    fn try_render(
        &self,
        snapshot: &SnapshotNode,
        options: &RenderOptions,
        render_id: u64,
    ) -> Result<RenderedPrompt> {
        let started = Instant::now();
        let tokenizer = self.tokenizers.tokenizer(options.tokenizer)?;
        let collected = self.collect(snapshot, options)?;

        let budget = TokenBudget::split(
            options.prompt_token_limit,
            options.suffix_percent,
            collected.suffix.value.is_empty(),
        )?;
        let elision_started = Instant::now();
        let elided = self.elision.elide(
            &collected.blocks,
            budget.prefix,
            &collected.suffix,
            budget.suffix,
            tokenizer.as_ref(),
        )?;
        let elision_time_ms = elapsed_ms(elision_started);

        let component_statistics = statistics(collected.structural, &elided);
        let update_data_time_ms = component_statistics
            .iter()
            .filter_map(|stats| stats.update_data_time_ms)
            .sum();
        let prefix_tokens = elided.prefix.iter().map(|b| b.elided_tokens).sum();
        let (prefix, context) = self.assemble(&elided.prefix, options);

        Ok(RenderedPrompt {
            prefix,
            prefix_tokens,
            suffix: elided.suffix.elided_value,
            suffix_tokens: elided.suffix.elided_tokens,
            context,
            metadata: RenderMetadata {
                render_id,
                render_time_ms: elapsed_ms(started),
                elision_time_ms,
                update_data_time_ms,
                tokenizer: tokenizer.name(),
                component_statistics,
            },
        })
    }

    /// Walk the snapshot into blocks.
    fn collect(&self, snapshot: &SnapshotNode, options: &RenderOptions) -> Result<Collected> {
        let mut transformers = default_transformers();
        transformers.push(transformer(section_transformer));
        if self.layout == PromptLayout::SplitContext {
            transformers.push(context_index_transformer());
        }

        let mut found_anchor = false;
        let mut blocks = Vec::new();
        let mut suffixes = Vec::new();
        let mut structural = Vec::new();
        SnapshotWalker::new(snapshot, transformers).walk_snapshot(|node, _parent, context| {
            found_anchor |= node.name() == BEFORE_CURSOR;
            let update_data_time_ms = node.statistics().update_data_time_ms;
            match node.value() {
                Some(value) if !value.is_empty() => {
                    let block = Block {
                        value: self.format_value(value, context, options),
                        section: context.section,
                        weight: context.weight,
                        component_path: node.path().to_string(),
                        update_data_time_ms,
                        chunks: Arc::clone(&context.chunks),
                        source: context.source.clone(),
                        index: context.index,
                    };
                    if block.section == Some(SectionType::Suffix) {
                        suffixes.push(block);
                    } else {
                        blocks.push(block);
                    }
                }
                _ => {
                    if let Some(ms) = update_data_time_ms {
                        structural.push(ComponentStatistics {
                            component_path: node.path().to_string(),
                            update_data_time_ms: Some(ms),
                            ..ComponentStatistics::default()
                        });
                    }
                }
            }
            true
        });

        if !found_anchor {
            return Err(PromptError::NodeNotFound(BEFORE_CURSOR.to_string()));
        }
        if suffixes.len() > 1 {
            return Err(PromptError::MultipleSuffixes);
        }
        let suffix = suffixes.pop().unwrap_or_else(Block::empty_suffix);
        Ok(Collected {
            blocks,
            suffix,
            structural,
        })
    }

    fn format_value(&self, value: &str, context: &WalkContext, options: &RenderOptions) -> String {
        let value = normalize_line_endings(value);
        match context.section {
            Some(SectionType::Prefix | SectionType::Suffix) => value.into_owned(),
            Some(SectionType::Context)
                if self.layout == PromptLayout::Combined && !is_shebang(&value) =>
            {
                comment_lines(&ensure_trailing(&value, &options.delimiter), &options.language_id)
            }
            _ => ensure_trailing(&value, &options.delimiter),
        }
    }

    /// Join surviving blocks into the prefix and, for the split layout, the
    /// context groups.
    fn assemble(&self, blocks: &[ElidedBlock], options: &RenderOptions) -> (String, Option<Vec<String>>) {
        match self.layout {
            PromptLayout::Combined => {
                let prefix: String = blocks.iter().map(|b| b.elided_value.as_str()).collect();
                (prefix, None)
            }
            PromptLayout::SplitContext => {
                let mut prefix = String::new();
                let mut groups: BTreeMap<usize, String> = BTreeMap::new();
                for block in blocks {
                    if block.block.section == Some(SectionType::Context) {
                        groups
                            .entry(block.block.index.unwrap_or_default())
                            .or_default()
                            .push_str(&block.elided_value);
                    } else {
                        prefix.push_str(&block.elided_value);
                    }
                }
                let context = groups
                    .into_values()
                    .map(|group| strip_trailing(&group, &options.delimiter).to_string())
                    .filter(|group| !group.is_empty())
                    .collect();
                (prefix, Some(context))
            }
        }
    }
}

/// Walk output before elision.
struct Collected {
    blocks: Vec<Block>,
    suffix: Block,
    structural: Vec<ComponentStatistics>,
}

/// Structural timings, then prefix/context blocks, then the suffix.
fn statistics(structural: Vec<ComponentStatistics>, elided: &ElisionResult) -> Vec<ComponentStatistics> {
    let mut stats = structural;
    let suffix = (!elided.suffix.block.value.is_empty()).then_some(&elided.suffix);
    for block in elided.prefix.iter().chain(suffix) {
        let has_tokens = block.tokens > 0;
        stats.push(ComponentStatistics {
            component_path: block.block.component_path.clone(),
            expected_tokens: has_tokens.then_some(block.tokens),
            actual_tokens: has_tokens.then_some(block.elided_tokens),
            source: block.block.source.clone(),
            update_data_time_ms: block.block.update_data_time_ms,
        });
    }
    stats
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
