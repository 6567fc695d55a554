//! Fitting blocks into token budgets.
//!
//! [`WishlistElision`] removes the lowest-weight removable blocks until the
//! prefix fits, removing a chunked block together with everything else in
//! its innermost chunk, whatever section those blocks belong to. Prefix
//! blocks outside any chunk are never removed that way: if the budget is
//! still exceeded they are dropped or truncated from the head, keeping the
//! text nearest the cursor. Finally, removed units are added back in reverse
//! removal order while they fit.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, trace};
use weave_core::Result;
use weave_tokens::Tokenizer;

use crate::block::{Block, ElidedBlock};

// =============================================================================
// Strategy trait
// =============================================================================

/// Output of an elision pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ElisionResult {
    /// The suffix after truncation.
    pub suffix: ElidedBlock,
    /// Prefix and context blocks, in input order.
    pub prefix: Vec<ElidedBlock>,
}

/// Fits prefix/context blocks and the suffix into their budgets.
pub trait ElisionStrategy: Send + Sync + fmt::Debug {
    /// Elide `prefix_blocks` into `prefix_budget` and `suffix` into
    /// `suffix_budget` tokens.
    fn elide(
        &self,
        prefix_blocks: &[Block],
        prefix_budget: usize,
        suffix: &Block,
        suffix_budget: usize,
        tokenizer: &dyn Tokenizer,
    ) -> Result<ElisionResult>;
}

// =============================================================================
// WishlistElision
// =============================================================================

/// Weight-ordered removal with chunk grouping and backfill.
#[derive(Clone, Copy, Debug, Default)]
pub struct WishlistElision;

/// Blocks taken out together.
struct Removal<'a> {
    members: Vec<usize>,
    chunk: Option<&'a str>,
}

impl ElisionStrategy for WishlistElision {
    fn elide(
        &self,
        prefix_blocks: &[Block],
        prefix_budget: usize,
        suffix: &Block,
        suffix_budget: usize,
        tokenizer: &dyn Tokenizer,
    ) -> Result<ElisionResult> {
        let tokens: Vec<usize> = prefix_blocks
            .iter()
            .map(|block| tokenizer.token_length(&block.value))
            .collect();
        let total: usize = tokens.iter().sum();

        let (suffix, prefix_budget) =
            elide_suffix(suffix, suffix_budget, prefix_budget, total, tokenizer);
        let prefix = elide_prefix(prefix_blocks, &tokens, prefix_budget, tokenizer);

        Ok(ElisionResult { suffix, prefix })
    }
}

/// Truncate the suffix and return the prefix budget it leaves.
///
/// An empty suffix or zero budget hands the whole suffix budget to the
/// prefix. Otherwise prefix headroom moves to the suffix first, and tokens
/// the suffix does not use move back.
fn elide_suffix(
    suffix: &Block,
    suffix_budget: usize,
    prefix_budget: usize,
    prefix_total: usize,
    tokenizer: &dyn Tokenizer,
) -> (ElidedBlock, usize) {
    let tokens = tokenizer.token_length(&suffix.value);
    if suffix.value.is_empty() || suffix_budget == 0 {
        return (
            ElidedBlock::dropped(suffix.clone(), tokens),
            prefix_budget + suffix_budget,
        );
    }

    let (suffix_budget, prefix_budget) = if prefix_total < prefix_budget {
        (suffix_budget + prefix_budget - prefix_total, prefix_total)
    } else {
        (suffix_budget, prefix_budget)
    };
    let kept = tokenizer.take_first_tokens(&suffix.value, suffix_budget);
    let unused = suffix_budget - kept.len().min(suffix_budget);
    trace!(tokens, kept = kept.len(), unused, "suffix elided");

    let elided_tokens = kept.len();
    (
        ElidedBlock {
            block: suffix.clone(),
            tokens,
            elided_value: kept.text,
            elided_tokens,
        },
        prefix_budget + unused,
    )
}

fn elide_prefix(
    blocks: &[Block],
    tokens: &[usize],
    budget: usize,
    tokenizer: &dyn Tokenizer,
) -> Vec<ElidedBlock> {
    let mut total: usize = tokens.iter().sum();
    let mut kept = vec![true; blocks.len()];
    let mut truncated: Option<(usize, String, usize)> = None;

    if total > budget {
        let mut removed_chunks: HashSet<&str> = HashSet::new();
        let removals = remove_by_weight(blocks, tokens, budget, &mut total, &mut kept, &mut removed_chunks);

        if total > budget {
            truncated = truncate_prefix(blocks, tokens, budget, &mut total, &mut kept, tokenizer);
        } else {
            backfill(blocks, tokens, budget, &removals, &mut total, &mut kept, &mut removed_chunks);
        }
        debug!(
            blocks = blocks.len(),
            removed = kept.iter().filter(|k| !**k).count(),
            total,
            budget,
            "prefix elided"
        );
    }

    blocks
        .iter()
        .zip(tokens)
        .enumerate()
        .map(|(i, (block, &count))| match &truncated {
            Some((idx, text, elided_tokens)) if *idx == i => ElidedBlock {
                block: block.clone(),
                tokens: count,
                elided_value: text.clone(),
                elided_tokens: *elided_tokens,
            },
            _ if kept[i] => ElidedBlock::kept(block.clone(), count),
            _ => ElidedBlock::dropped(block.clone(), count),
        })
        .collect()
}

/// Remove removable blocks, lowest weight first, until `total` fits.
fn remove_by_weight<'a>(
    blocks: &'a [Block],
    tokens: &[usize],
    budget: usize,
    total: &mut usize,
    kept: &mut [bool],
    removed_chunks: &mut HashSet<&'a str>,
) -> Vec<Removal<'a>> {
    let mut order: Vec<usize> = (0..blocks.len())
        .filter(|&i| !blocks[i].is_prefix() || blocks[i].innermost_chunk().is_some())
        .collect();
    order.sort_by(|&a, &b| blocks[a].weight.total_cmp(&blocks[b].weight).then(a.cmp(&b)));

    let mut removals = Vec::new();
    for i in order {
        if *total <= budget {
            break;
        }
        if !kept[i] {
            continue;
        }
        let chunk = blocks[i].innermost_chunk();
        let members: Vec<usize> = match chunk {
            Some(path) => (0..blocks.len())
                .filter(|&j| kept[j] && blocks[j].in_chunk(path))
                .collect(),
            None => vec![i],
        };
        for &j in &members {
            kept[j] = false;
            *total -= tokens[j];
        }
        if let Some(path) = chunk {
            let _ = removed_chunks.insert(path);
        }
        trace!(
            path = %blocks[i].component_path,
            weight = blocks[i].weight,
            members = members.len(),
            total = *total,
            "removed"
        );
        removals.push(Removal { members, chunk });
    }
    removals
}

/// Re-add removed units, most recent first, while they fit and no enclosing
/// chunk is still removed.
fn backfill<'a>(
    blocks: &'a [Block],
    tokens: &[usize],
    budget: usize,
    removals: &[Removal<'a>],
    total: &mut usize,
    kept: &mut [bool],
    removed_chunks: &mut HashSet<&'a str>,
) {
    for removal in removals.iter().rev() {
        let cost: usize = removal.members.iter().map(|&j| tokens[j]).sum();
        if *total + cost > budget {
            continue;
        }
        if let (Some(chunk), Some(&first)) = (removal.chunk, removal.members.first()) {
            let chain = &blocks[first].chunks;
            let own = chain.iter().position(|c| c == chunk).unwrap_or(chain.len());
            if chain[..own].iter().any(|c| removed_chunks.contains(c.as_str())) {
                continue;
            }
        }
        for &j in &removal.members {
            kept[j] = true;
        }
        *total += cost;
        if let Some(chunk) = removal.chunk {
            let _ = removed_chunks.remove(chunk);
        }
        trace!(members = removal.members.len(), total = *total, "restored");
    }
}

/// Drop earlier unchunked prefix blocks, then cut the last one from its head.
///
/// Returns the truncated block's index, text and token count.
fn truncate_prefix(
    blocks: &[Block],
    tokens: &[usize],
    budget: usize,
    total: &mut usize,
    kept: &mut [bool],
    tokenizer: &dyn Tokenizer,
) -> Option<(usize, String, usize)> {
    let prefix: Vec<usize> = (0..blocks.len())
        .filter(|&i| blocks[i].is_prefix() && blocks[i].chunks.is_empty())
        .collect();
    let (&last, earlier) = prefix.split_last()?;

    for &i in earlier {
        if *total <= budget {
            return None;
        }
        if kept[i] {
            kept[i] = false;
            *total -= tokens[i];
        }
    }
    if *total <= budget {
        return None;
    }

    let others = *total - tokens[last];
    let allowance = budget.saturating_sub(others);
    let (text, count) = keep_tail(&blocks[last].value, allowance, tokenizer);
    debug!(
        path = %blocks[last].component_path,
        tokens = tokens[last],
        kept = count,
        "prefix truncated"
    );
    *total = others + count;
    Some((last, text, count))
}

/// Longest tail of `text` within `allowance` tokens: whole lines while
/// possible, tokens once a single line remains.
fn keep_tail(text: &str, allowance: usize, tokenizer: &dyn Tokenizer) -> (String, usize) {
    let mut rest = text;
    loop {
        let count = tokenizer.token_length(rest);
        if count <= allowance {
            return (rest.to_string(), count);
        }
        match rest.find('\n') {
            Some(idx) if idx + 1 < rest.len() => rest = &rest[idx + 1..],
            _ => {
                let tail = tokenizer.take_last_tokens(rest, allowance);
                let count = tail.len();
                return (tail.text, count);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use weave_tokens::{TokenSlice, TokenizerName};
    use weave_tree::SectionType;

    /// Newlines are one token each; every word carries the spaces before it.
    #[derive(Debug)]
    struct Words;

    impl Words {
        fn pieces(text: &str) -> Vec<&str> {
            let mut starts = Vec::new();
            let mut prev = None;
            for (i, c) in text.char_indices() {
                let starts_piece = match prev {
                    None | Some('\n') => true,
                    Some(p) => c == '\n' || (c == ' ' && p != ' '),
                };
                if starts_piece {
                    starts.push(i);
                }
                prev = Some(c);
            }
            starts
                .iter()
                .enumerate()
                .map(|(k, &start)| &text[start..starts.get(k + 1).copied().unwrap_or(text.len())])
                .collect()
        }
    }

    impl Tokenizer for Words {
        fn name(&self) -> TokenizerName {
            TokenizerName::O200k
        }

        fn tokenize(&self, text: &str) -> Vec<u32> {
            Self::pieces(text)
                .iter()
                .map(|piece| u32::try_from(piece.len()).unwrap())
                .collect()
        }

        fn take_first_tokens(&self, text: &str, n: usize) -> TokenSlice {
            let kept: String = Self::pieces(text).into_iter().take(n).collect();
            TokenSlice {
                tokens: self.tokenize(&kept),
                text: kept,
            }
        }

        fn take_last_tokens(&self, text: &str, n: usize) -> TokenSlice {
            let pieces = Self::pieces(text);
            let kept = pieces[pieces.len().saturating_sub(n)..].concat();
            TokenSlice {
                tokens: self.tokenize(&kept),
                text: kept,
            }
        }
    }

    fn block(value: &str, section: Option<SectionType>, weight: f64, chunks: &[&str]) -> Block {
        Block {
            value: value.to_string(),
            section,
            weight,
            component_path: format!("$.{value}"),
            update_data_time_ms: None,
            chunks: Arc::new(chunks.iter().map(|c| (*c).to_string()).collect()),
            source: None,
            index: None,
        }
    }

    fn context(value: &str, weight: f64) -> Block {
        block(value, Some(SectionType::Context), weight, &[])
    }

    fn prefix(value: &str) -> Block {
        block(value, Some(SectionType::Prefix), 1.0, &[])
    }

    fn suffix(value: &str) -> Block {
        block(value, Some(SectionType::Suffix), 1.0, &[])
    }

    fn run(blocks: &[Block], budget: usize, suffix_block: &Block, suffix_budget: usize) -> ElisionResult {
        WishlistElision
            .elide(blocks, budget, suffix_block, suffix_budget, &Words)
            .unwrap()
    }

    fn surviving(result: &ElisionResult) -> Vec<&str> {
        result
            .prefix
            .iter()
            .filter(|b| !b.elided_value.is_empty())
            .map(|b| b.elided_value.as_str())
            .collect()
    }

    // -- test tokenizer --

    #[test]
    fn words_keep_leading_spaces() {
        assert_eq!(
            Words::pieces("const a = 1;\nfunction  f"),
            vec!["const", " a", " =", " 1;", "\n", "function", "  f"]
        );
    }

    // -- suffix --

    #[test]
    fn empty_suffix_donates_budget() {
        let blocks = [context("a b c d\n", 1.0)];
        let result = run(&blocks, 2, &suffix(""), 3);
        assert_eq!(result.suffix.elided_value, "");
        // 5 tokens fit in 2 + 3
        assert_eq!(surviving(&result), vec!["a b c d\n"]);
    }

    #[test]
    fn unused_prefix_budget_grows_suffix() {
        let blocks = [prefix("x")];
        // prefix uses 1 of 10, so the suffix may take 2 + 9
        let result = run(&blocks, 10, &suffix("const b = 2;\nconst c = 3;"), 2);
        assert_eq!(result.suffix.elided_value, "const b = 2;\nconst c = 3;");
        assert_eq!(result.suffix.elided_tokens, 9);
    }

    #[test]
    fn suffix_is_cut_to_its_budget() {
        let blocks = [prefix("a b c d e f g h i j k l m n o p q r s t u v w x y z")];
        let result = run(&blocks, 22, &suffix("const b = 2;\nconst c = 3;"), 3);
        assert_eq!(result.suffix.elided_value, "const b =");
        assert_eq!(result.suffix.tokens, 9);
    }

    // -- removal order --

    #[test]
    fn lowest_weight_goes_first_then_document_order() {
        let blocks = [
            context("one\n", 0.9),
            context("two\n", 0.5),
            context("three\n", 0.9),
            prefix("p"),
        ];
        // 2 + 2 + 2 + 1 = 7 tokens into 4
        let result = run(&blocks, 4, &suffix(""), 0);
        assert_eq!(surviving(&result), vec!["three\n", "p"]);
    }

    #[test]
    fn untyped_blocks_are_removable() {
        let blocks = [block("loose\n", None, 0.1, &[]), prefix("p")];
        let result = run(&blocks, 1, &suffix(""), 0);
        assert_eq!(surviving(&result), vec!["p"]);
    }

    #[test]
    fn backfill_restores_what_fits() {
        let blocks = [
            context("a\n", 0.1),
            context("b c d e f\n", 0.2),
            context("keep\n", 1.0),
        ];
        // 2 + 6 + 2 = 10 into 5: remove a (8), remove b..f (2), restore a (4)
        let result = run(&blocks, 5, &suffix(""), 0);
        assert_eq!(surviving(&result), vec!["a\n", "keep\n"]);
    }

    // -- chunks --

    #[test]
    fn chunk_members_leave_together() {
        let blocks = [
            block("c1\n", Some(SectionType::Context), 0.5, &["$.C"]),
            block("c2\n", Some(SectionType::Context), 0.9, &["$.C"]),
            context("out\n", 0.7),
        ];
        let result = run(&blocks, 3, &suffix(""), 0);
        assert_eq!(surviving(&result), vec!["out\n"]);
    }

    #[test]
    fn chunk_around_prefix_text_leaves_together() {
        let blocks = [
            block("head\n", Some(SectionType::Prefix), 1.0, &["$.C"]),
            block("note\n", Some(SectionType::Context), 0.2, &["$.C"]),
            context("keep\n", 0.9),
            prefix("anchor"),
        ];
        // 7 into 4: removing note takes head with it (3); the chunk cannot return
        let result = run(&blocks, 4, &suffix(""), 0);
        assert_eq!(surviving(&result), vec!["keep\n", "anchor"]);
        assert_eq!(result.prefix[0].elided_tokens, 0);
        assert_eq!(result.prefix[1].elided_tokens, 0);
    }

    #[test]
    fn chunked_prefix_text_is_never_truncated() {
        let blocks = [
            block("one two\nthree four\n", Some(SectionType::Prefix), 1.0, &["$.C"]),
            prefix("tail"),
        ];
        // 6 + 1 into 2: the chunk goes whole, the anchor stays
        let result = run(&blocks, 2, &suffix(""), 0);
        assert_eq!(surviving(&result), vec!["tail"]);
        assert_eq!(result.prefix[0].elided_value, "");
    }

    #[test]
    fn nested_chunk_waits_for_enclosing_chunk() {
        let blocks = [
            block("o p q r\n", Some(SectionType::Context), 0.1, &["$.A"]),
            block("inner\n", Some(SectionType::Context), 0.05, &["$.A", "$.A.B"]),
            context("x y z w\n", 1.0),
        ];
        // 12 into 7: inner goes (10), then outer (5). inner alone would fit
        // back, but its enclosing chunk is still out
        let result = run(&blocks, 7, &suffix(""), 0);
        assert_eq!(surviving(&result), vec!["x y z w\n"]);
    }

    // -- prefix truncation --

    #[test]
    fn prefix_keeps_lines_nearest_the_cursor() {
        let blocks = [context("ctx\n", 0.5), prefix("const a = 1;\nfunction f")];
        let result = run(&blocks, 5, &suffix(""), 0);
        assert_eq!(surviving(&result), vec!["function f"]);
        assert_eq!(result.prefix[1].elided_tokens, 2);
        assert_eq!(result.prefix[1].tokens, 7);
    }

    #[test]
    fn single_line_prefix_is_cut_by_tokens() {
        let blocks = [prefix("alpha beta gamma delta")];
        let result = run(&blocks, 2, &suffix(""), 0);
        assert_eq!(surviving(&result), vec![" gamma delta"]);
    }

    #[test]
    fn earlier_prefix_blocks_drop_whole() {
        let blocks = [prefix("first block\n"), prefix("last")];
        let result = run(&blocks, 1, &suffix(""), 0);
        assert_eq!(surviving(&result), vec!["last"]);
    }

    #[test]
    fn no_backfill_after_truncation() {
        let blocks = [context("a\n", 0.5), prefix("one two\nthree four five")];
        // context goes, prefix still 6 > 5, truncated to 3; "a\n" would fit
        let result = run(&blocks, 5, &suffix(""), 0);
        assert_eq!(surviving(&result), vec!["three four five"]);
    }

    #[test]
    fn everything_fits_untouched() {
        let blocks = [context("a\n", 0.5), prefix("p")];
        let result = run(&blocks, 100, &suffix("s"), 10);
        assert_eq!(surviving(&result), vec!["a\n", "p"]);
        assert_eq!(result.suffix.elided_value, "s");
    }
}
