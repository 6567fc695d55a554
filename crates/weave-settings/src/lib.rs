//! # weave-settings
//!
//! Layered configuration for the Weave prompt engine.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`WeaveSettings::default()`]
//! 2. **User file**: `~/.weave/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `WEAVE_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton, filled on first access.
static SETTINGS: OnceLock<WeaveSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads `~/.weave/settings.json` with env var overrides,
/// falling back to compiled defaults if loading fails.
pub fn get_settings() -> &'static WeaveSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load settings, using defaults");
            WeaveSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: WeaveSettings) -> std::result::Result<(), WeaveSettings> {
    SETTINGS.set(settings)
}
