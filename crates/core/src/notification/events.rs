use serde::{Deserialize, Serialize};

use crate::media::MediaType;

/// Events raised by reconciliation and scanning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A media track became available.
    MediaAvailable {
        media_id: i64,
        media_type: MediaType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        is_alt: bool,
    },
    /// A pending request was approved because the media appeared on its own.
    RequestAutoApproved {
        request_id: i64,
        media_id: i64,
        requested_by: i64,
        is_alt: bool,
    },
    /// A request was satisfied.
    RequestCompleted {
        request_id: i64,
        media_id: i64,
        requested_by: i64,
        is_alt: bool,
    },
    /// A scan session ended.
    ScanFinished {
        service: String,
        session_id: String,
        outcome: String,
        processed: usize,
        total: usize,
    },
}

impl NotificationEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MediaAvailable { .. } => "media_available",
            Self::RequestAutoApproved { .. } => "request_auto_approved",
            Self::RequestCompleted { .. } => "request_completed",
            Self::ScanFinished { .. } => "scan_finished",
        }
    }

    /// Media the event refers to, if any.
    pub fn media_id(&self) -> Option<i64> {
        match self {
            Self::MediaAvailable { media_id, .. }
            | Self::RequestAutoApproved { media_id, .. }
            | Self::RequestCompleted { media_id, .. } => Some(*media_id),
            Self::ScanFinished { .. } => None,
        }
    }
}
