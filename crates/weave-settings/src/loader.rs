//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`WeaveSettings::default()`]
//! 2. If `~/.weave/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `WEAVE_*` environment variable overrides (highest priority)
//! 4. Validate the result

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use weave_core::logging::LogLevel;
use weave_tokens::TokenizerName;

use crate::errors::Result;
use crate::types::WeaveSettings;

/// Resolve the path to the settings file (`~/.weave/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".weave").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<WeaveSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON or out-of-range values are
/// errors.
pub fn load_settings_from_path(path: &Path) -> Result<WeaveSettings> {
    let defaults = serde_json::to_value(WeaveSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: WeaveSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Overlay `overlay` onto `base`, key by key.
///
/// Nested objects merge; any other overlay value replaces what `base` held.
/// A `null` inside an overlay object leaves the base entry alone.
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(entries), Value::Object(overlay)) => {
            for (key, value) in overlay.into_iter().filter(|(_, v)| !v.is_null()) {
                match entries.get_mut(&key) {
                    Some(slot) => merge_into(slot, value),
                    None => {
                        let _ = entries.insert(key, value);
                    }
                }
            }
        }
        (slot, overlay) => *slot = overlay,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (falling back to file/default).
pub fn apply_env_overrides(settings: &mut WeaveSettings) {
    // ── Render settings ─────────────────────────────────────────────
    if let Some(v) = read_env_usize("WEAVE_PROMPT_TOKEN_LIMIT", 1, 10_000_000) {
        settings.render.prompt_token_limit = v;
    }
    if let Some(v) = read_env_u32("WEAVE_SUFFIX_PERCENT", 0, 100) {
        settings.render.suffix_percent = v;
    }
    if let Some(v) = read_env_string("WEAVE_DELIMITER") {
        settings.render.delimiter = unescape_delimiter(&v);
    }
    if let Some(v) = read_env_string("WEAVE_TOKENIZER") {
        match v.parse::<TokenizerName>() {
            Ok(name) => settings.render.tokenizer = name,
            Err(err) => tracing::warn!(key = "WEAVE_TOKENIZER", error = %err, "ignoring"),
        }
    }

    // ── Completion settings ─────────────────────────────────────────
    if let Some(v) = read_env_u32("WEAVE_SUFFIX_MATCH_THRESHOLD", 0, 100) {
        settings.completions.suffix_match_threshold = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("WEAVE_LOG_LEVEL") {
        settings.logging.level = LogLevel::from_str_lossy(&v);
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Expand the `\n`, `\r` and `\t` escapes shells make awkward to pass raw.
pub fn unescape_delimiter(val: &str) -> String {
    val.replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
