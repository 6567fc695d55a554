//! [`VirtualPrompt`]: the façade callers hold on to.
//!
//! It owns a [`Reconciler`], hands out data pipes, and turns the live tree
//! into immutable snapshots. `snapshot` is an error boundary: failures and
//! cancellation come back as [`SnapshotResult`] variants.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use weave_core::{CancellationToken, PromptError, Result};

use crate::element::Element;
use crate::reconciler::{Pipe, Reconciler};
use crate::snapshot::SnapshotNode;

/// Outcome of [`VirtualPrompt::snapshot`].
#[derive(Clone, Debug)]
pub enum SnapshotResult {
    /// The frozen tree.
    Ok(Arc<SnapshotNode>),
    /// The token fired before the copy finished.
    Cancelled,
    /// Reconciliation or freezing failed.
    Error(PromptError),
}

/// Status tag of a [`SnapshotResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    /// Snapshot produced.
    Ok,
    /// Cancelled.
    Cancelled,
    /// Failed.
    Error,
}

impl SnapshotResult {
    /// Status tag.
    #[must_use]
    pub fn status(&self) -> SnapshotStatus {
        match self {
            Self::Ok(_) => SnapshotStatus::Ok,
            Self::Cancelled => SnapshotStatus::Cancelled,
            Self::Error(_) => SnapshotStatus::Error,
        }
    }

    /// The snapshot, if one was produced.
    #[must_use]
    pub fn snapshot(&self) -> Option<&Arc<SnapshotNode>> {
        match self {
            Self::Ok(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// Consume into the snapshot, if one was produced.
    #[must_use]
    pub fn into_snapshot(self) -> Option<Arc<SnapshotNode>> {
        match self {
            Self::Ok(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// The error, if the snapshot failed.
    #[must_use]
    pub fn error(&self) -> Option<&PromptError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// A reactive prompt tree.
#[derive(Debug)]
pub struct VirtualPrompt {
    reconciler: Reconciler,
}

impl VirtualPrompt {
    /// Build the tree for `root`.
    pub fn new(root: Element) -> Result<Self> {
        Ok(Self {
            reconciler: Reconciler::new(root)?,
        })
    }

    /// A pipe for pumping data into this prompt.
    pub fn create_pipe(&self) -> Pipe {
        self.reconciler.create_pipe()
    }

    /// Reconcile, then freeze the tree.
    pub fn snapshot(&mut self, cancel: Option<&CancellationToken>) -> SnapshotResult {
        if let Err(err) = self.reconciler.reconcile(cancel) {
            warn!(error = %err, "reconcile failed");
            return SnapshotResult::Error(err);
        }
        match self.reconciler.freeze(cancel) {
            Ok(Some(snapshot)) => SnapshotResult::Ok(Arc::new(snapshot)),
            Ok(None) => {
                debug!("snapshot cancelled");
                SnapshotResult::Cancelled
            }
            Err(err) => {
                warn!(error = %err, "snapshot failed");
                SnapshotResult::Error(err)
            }
        }
    }

    /// The underlying reconciler.
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
