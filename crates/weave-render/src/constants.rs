//! Rendering constants.

// =============================================================================
// Component names
// =============================================================================

/// Holds the text before the cursor. Every renderable tree must contain one.
pub const BEFORE_CURSOR: &str = "BeforeCursor";

/// Holds the text after the cursor line.
pub const AFTER_CURSOR: &str = "AfterCursor";

/// Splits the current document at the cursor.
pub const CURRENT_FILE: &str = "CurrentFile";

/// Primary context group.
pub const COMPLETIONS_CONTEXT: &str = "CompletionsContext";

/// Secondary context group.
pub const ADDITIONAL_COMPLETIONS_CONTEXT: &str = "AdditionalCompletionsContext";

/// Components whose subtrees render as context.
pub const CONTEXT_COMPONENTS: [&str; 2] = [COMPLETIONS_CONTEXT, ADDITIONAL_COMPLETIONS_CONTEXT];

// =============================================================================
// Token budget
// =============================================================================

/// Tokens held back from the limit when a suffix is present, for the
/// fill-in-the-middle markers the model wraps around it.
pub const SUFFIX_ENCODING_RESERVE: usize = 5;

// =============================================================================
// Suffix cache
// =============================================================================

/// Default edit-distance percentage under which the cached suffix is kept.
pub const DEFAULT_SUFFIX_MATCH_THRESHOLD: u32 = 10;

/// Leading tokens compared when deciding whether a suffix changed.
pub const SUFFIX_COMPARE_TOKENS: usize = 50;
