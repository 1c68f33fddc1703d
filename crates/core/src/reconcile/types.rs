//! Types for the reconciliation engine.

use serde::Serialize;
use thiserror::Error;

use crate::media::{MediaError, MediaSnapshot};

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Media record not found.
    #[error("media not found: {0}")]
    MediaNotFound(i64),

    /// A blocklisted track may only leave that state through `unblocklist`.
    #[error("media {media_id} is blocklisted")]
    Blocklisted { media_id: i64 },

    /// Unblock or removal requested for media that is not blocklisted.
    #[error("media {0} is not blocklisted")]
    NotBlocklisted(i64),

    /// Persistence error.
    #[error("media store error: {0}")]
    Store(#[from] MediaError),
}

/// Decides whether the caller is still allowed to write.
///
/// Scan sessions hand the engine a guard tied to their generation token so
/// that a cancelled or superseded session cannot apply stale state.
pub trait TransitionGuard: Send + Sync {
    fn is_current(&self) -> bool;
}

/// Guard for callers outside a scan session.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysCurrent;

impl TransitionGuard for AlwaysCurrent {
    fn is_current(&self) -> bool {
        true
    }
}

/// Result of a single `apply` call.
#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    /// The snapshot was reconciled against the stored state.
    Applied(ApplyReport),
    /// The guard rejected the write; nothing was persisted.
    Skipped,
}

impl ApplyOutcome {
    pub fn report(&self) -> Option<&ApplyReport> {
        match self {
            ApplyOutcome::Applied(report) => Some(report),
            ApplyOutcome::Skipped => None,
        }
    }
}

/// What an applied snapshot changed.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    /// Stored state after the call.
    pub snapshot: MediaSnapshot,
    /// False when the snapshot matched the stored state and nothing was written.
    pub changed: bool,
    /// Requests moved from PENDING to APPROVED.
    pub auto_approved: Vec<i64>,
    /// Requests moved from APPROVED to COMPLETED.
    pub completed: Vec<i64>,
    /// Season requests moved to COMPLETED.
    pub completed_seasons: Vec<i64>,
}
