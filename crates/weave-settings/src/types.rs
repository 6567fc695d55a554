//! Settings structures.
//!
//! Every struct deserializes from camelCase JSON with per-field defaults, so
//! a partial user file only overrides what it names.

use serde::{Deserialize, Serialize};
use weave_core::logging::LogLevel;
use weave_tokens::TokenizerName;

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeaveSettings {
    /// Token budgeting and output layout.
    pub render: RenderSettings,
    /// Completion component behaviour.
    pub completions: CompletionSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl WeaveSettings {
    /// Reject values the renderer cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.render.prompt_token_limit == 0 {
            return Err(SettingsError::InvalidValue(
                "render.promptTokenLimit must be greater than 0".into(),
            ));
        }
        if self.render.suffix_percent > 100 {
            return Err(SettingsError::InvalidValue(format!(
                "render.suffixPercent must be at most 100, got {}",
                self.render.suffix_percent
            )));
        }
        if self.completions.suffix_match_threshold > 100 {
            return Err(SettingsError::InvalidValue(format!(
                "completions.suffixMatchThreshold must be at most 100, got {}",
                self.completions.suffix_match_threshold
            )));
        }
        Ok(())
    }
}

/// Token budget settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderSettings {
    /// Hard token limit for prefix, context and suffix together.
    pub prompt_token_limit: usize,
    /// Share of the limit reserved for the suffix (0–100).
    pub suffix_percent: u32,
    /// Terminator appended to context and plain text blocks.
    pub delimiter: String,
    /// Encoder used for counting.
    pub tokenizer: TokenizerName,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            prompt_token_limit: 8192,
            suffix_percent: 15,
            delimiter: "\n".to_string(),
            tokenizer: TokenizerName::O200k,
        }
    }
}

/// Completion component settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionSettings {
    /// Edit-distance percentage under which a cached suffix is reused.
    pub suffix_match_threshold: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            suffix_match_threshold: 10,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level written to stderr.
    pub level: LogLevel,
}
