//! Splitting the prompt token limit between prefix and suffix.

use weave_core::{PromptError, Result};

use crate::constants::SUFFIX_ENCODING_RESERVE;

/// Token budgets for the two halves of a prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenBudget {
    /// Tokens for prefix and context blocks.
    pub prefix: usize,
    /// Tokens for the suffix.
    pub suffix: usize,
}

impl TokenBudget {
    /// Split `limit` for a prompt whose suffix is `suffix_is_empty` or not.
    ///
    /// With no suffix (or a zero share) the prefix gets the whole limit.
    /// Otherwise [`SUFFIX_ENCODING_RESERVE`] tokens are held back and the
    /// suffix gets `ceil(available * suffix_percent / 100)`.
    pub fn split(limit: usize, suffix_percent: u32, suffix_is_empty: bool) -> Result<Self> {
        if suffix_percent > 100 {
            return Err(PromptError::InvalidBudget(format!(
                "suffix percent must be at most 100, got {suffix_percent}"
            )));
        }
        let budget = if suffix_is_empty || suffix_percent == 0 {
            Self {
                prefix: limit,
                suffix: 0,
            }
        } else {
            let available = limit.saturating_sub(SUFFIX_ENCODING_RESERVE);
            let suffix = (available * suffix_percent as usize).div_ceil(100);
            Self {
                prefix: available - suffix,
                suffix,
            }
        };
        if budget.prefix == 0 {
            return Err(PromptError::InvalidBudget(format!(
                "prefix budget must be greater than 0 (limit {limit}, suffix {suffix_percent}%)"
            )));
        }
        Ok(budget)
    }
}
