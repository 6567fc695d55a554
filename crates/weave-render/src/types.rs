//! Render options and results.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use weave_core::PromptError;
use weave_settings::RenderSettings;
use weave_tokens::TokenizerName;

/// Per-render options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Appended to context and plain text blocks.
    pub delimiter: String,
    /// Encoder used for counting.
    pub tokenizer: TokenizerName,
    /// Hard limit for the whole prompt.
    pub prompt_token_limit: usize,
    /// Share of the limit reserved for the suffix (0–100).
    pub suffix_percent: u32,
    /// Language of the current document, for comment markers.
    pub language_id: String,
}

impl Default for RenderOptions {
    /// Options from the global settings, for a plain-text document.
    fn default() -> Self {
        Self::from_settings(&weave_settings::get_settings().render, "plaintext")
    }
}

impl RenderOptions {
    /// Options from render settings for a document in `language_id`.
    pub fn from_settings(settings: &RenderSettings, language_id: impl Into<String>) -> Self {
        Self {
            delimiter: settings.delimiter.clone(),
            tokenizer: settings.tokenizer,
            prompt_token_limit: settings.prompt_token_limit,
            suffix_percent: settings.suffix_percent,
            language_id: language_id.into(),
        }
    }

    /// Set the token limit.
    #[must_use]
    pub fn with_limit(mut self, prompt_token_limit: usize) -> Self {
        self.prompt_token_limit = prompt_token_limit;
        self
    }

    /// Set the suffix share.
    #[must_use]
    pub fn with_suffix_percent(mut self, suffix_percent: u32) -> Self {
        self.suffix_percent = suffix_percent;
        self
    }

    /// Set the language.
    #[must_use]
    pub fn with_language(mut self, language_id: impl Into<String>) -> Self {
        self.language_id = language_id.into();
        self
    }
}

/// Token accounting for one component path.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatistics {
    /// Node path.
    pub component_path: String,
    /// Tokens before elision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_tokens: Option<usize>,
    /// Tokens after elision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_tokens: Option<usize>,
    /// Inherited `source` prop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    /// Data update time, ms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_data_time_ms: Option<f64>,
}

/// Render diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetadata {
    /// Per-renderer counter, starting at 0.
    pub render_id: u64,
    /// Wall time of the whole render, ms.
    pub render_time_ms: f64,
    /// Wall time of elision alone, ms.
    pub elision_time_ms: f64,
    /// Sum of component data update times, ms.
    pub update_data_time_ms: f64,
    /// Encoder used.
    pub tokenizer: TokenizerName,
    /// Structural timings first, then one entry per block.
    pub component_statistics: Vec<ComponentStatistics>,
}

/// A rendered prompt.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPrompt {
    /// Text before the cursor, with context folded in for the combined layout.
    pub prefix: String,
    /// Tokens of every prefix and context block kept.
    pub prefix_tokens: usize,
    /// Text after the cursor line.
    pub suffix: String,
    /// Tokens of `suffix`.
    pub suffix_tokens: usize,
    /// Context groups; split layout only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,
    /// Diagnostics.
    pub metadata: RenderMetadata,
}

/// Outcome of a render.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderResult {
    /// The prompt.
    Ok(RenderedPrompt),
    /// Cancelled before rendering.
    Cancelled,
    /// Rendering failed.
    Error(PromptError),
}

/// Status tag of a [`RenderResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    /// Rendered.
    Ok,
    /// Cancelled.
    Cancelled,
    /// Failed.
    Error,
}

impl RenderResult {
    /// Status tag.
    #[must_use]
    pub fn status(&self) -> RenderStatus {
        match self {
            Self::Ok(_) => RenderStatus::Ok,
            Self::Cancelled => RenderStatus::Cancelled,
            Self::Error(_) => RenderStatus::Error,
        }
    }

    /// The prompt, if rendered.
    #[must_use]
    pub fn prompt(&self) -> Option<&RenderedPrompt> {
        match self {
            Self::Ok(prompt) => Some(prompt),
            _ => None,
        }
    }

    /// Consume into the prompt, if rendered.
    #[must_use]
    pub fn into_prompt(self) -> Option<RenderedPrompt> {
        match self {
            Self::Ok(prompt) => Some(prompt),
            _ => None,
        }
    }

    /// The error, if rendering failed.
    #[must_use]
    pub fn error(&self) -> Option<&PromptError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// `{"status": "ok", "prompt": {..}}`, `{"status": "cancelled"}` or
/// `{"status": "error", "error": "<message>"}`.
impl Serialize for RenderResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("status", &self.status())?;
        match self {
            Self::Ok(prompt) => map.serialize_entry("prompt", prompt)?,
            Self::Cancelled => {}
            Self::Error(err) => map.serialize_entry("error", &err.to_string())?,
        }
        map.end()
    }
}
