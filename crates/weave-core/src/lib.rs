//! # weave-core
//!
//! Foundation types shared by every Weave crate.
//!
//! - **Errors**: [`PromptError`] taxonomy via `thiserror`, plus the [`Result`] alias
//! - **Cancellation**: [`CancellationToken`] re-export and the [`is_cancelled`] helper
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` stderr subscriber
//! - **Text**: line-ending normalization and delimiter helpers used by the renderer

#![deny(unsafe_code)]

pub mod cancel;
pub mod errors;
pub mod logging;
pub mod text;

pub use cancel::{CancellationToken, is_cancelled};
pub use errors::{PromptError, Result};
