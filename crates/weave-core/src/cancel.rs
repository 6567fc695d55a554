//! Cooperative cancellation.
//!
//! Weave never spawns work of its own, so cancellation is polled at a few
//! well-defined points (start of reconcile, each snapshot step, start of
//! render) against an optional caller-supplied token.

pub use tokio_util::sync::CancellationToken;

/// Returns `true` when a token was supplied and has been cancelled.
#[must_use]
pub fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.is_some_and(CancellationToken::is_cancelled)
}
