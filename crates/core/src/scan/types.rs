//! Types for scan sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::arr::ServiceError;
use crate::media::MediaError;
use crate::reconcile::ReconcileError;

/// Errors raised while scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The session was cancelled before it finished.
    #[error("scan aborted by cancellation")]
    AbortedByCancellation,

    /// A newer session took over.
    #[error("scan aborted by a newer session")]
    AbortedBySupersession,

    /// One item could not be processed; the session carries on.
    #[error("failed to process '{item}': {message}")]
    ItemProcessing { item: String, message: String },

    /// An instance could not be listed; it is skipped for this session.
    #[error("source '{instance}' unreachable: {source}")]
    SourceUnreachable {
        instance: String,
        #[source]
        source: ServiceError,
    },
}

impl ScanError {
    pub fn item(item: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ScanError::ItemProcessing {
            item: item.into(),
            message: err.to_string(),
        }
    }

    /// Session lifecycle errors are expected and not failures.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            ScanError::AbortedByCancellation | ScanError::AbortedBySupersession
        )
    }
}

impl From<ReconcileError> for ScanError {
    fn from(err: ReconcileError) -> Self {
        ScanError::item("reconcile", err)
    }
}

impl From<MediaError> for ScanError {
    fn from(err: MediaError) -> Self {
        ScanError::item("store", err)
    }
}

/// Result of one step of the batch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// More items are buffered.
    Continue,
    /// The buffer drained.
    Finished,
    /// The session was cancelled.
    Cancelled,
    /// A newer session owns the scanner.
    Superseded,
}

/// Effect of processing one inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemResult {
    /// Stored state changed.
    Applied,
    /// Stored state already matched.
    Unchanged,
    /// Item ignored (blocklisted, missing identity or stale session).
    Skipped,
}

impl ItemResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemResult::Applied => "applied",
            ItemResult::Unchanged => "unchanged",
            ItemResult::Skipped => "skipped",
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Finished {
        processed: usize,
        total: usize,
        failed: usize,
    },
    Cancelled {
        processed: usize,
    },
    Superseded {
        processed: usize,
    },
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::Finished { .. } => "finished",
            ScanOutcome::Cancelled { .. } => "cancelled",
            ScanOutcome::Superseded { .. } => "superseded",
        }
    }

    pub fn processed(&self) -> usize {
        match self {
            ScanOutcome::Finished { processed, .. }
            | ScanOutcome::Cancelled { processed }
            | ScanOutcome::Superseded { processed } => *processed,
        }
    }
}

/// Snapshot of a scanner's state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanStatus {
    pub service: String,
    pub running: bool,
    /// Items processed so far in the current session.
    pub progress: usize,
    /// Items buffered for the current session.
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<ScanOutcome>,
}

/// Handle to a started session.
pub struct ScanHandle {
    pub session_id: String,
    pub(super) task: JoinHandle<ScanOutcome>,
}

impl ScanHandle {
    /// Wait for the session to end.
    pub async fn wait(self) -> Result<ScanOutcome, tokio::task::JoinError> {
        self.task.await
    }
}
