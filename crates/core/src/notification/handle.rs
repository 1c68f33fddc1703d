use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use super::NotificationEvent;

/// Envelope wrapping a notification event with its emission time
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEnvelope {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: NotificationEvent,
}

/// Handle for emitting notification events
///
/// Cheaply cloneable. Events go through a channel to the
/// `NotificationDispatcher`, so emitting never waits on delivery.
#[derive(Clone)]
pub struct NotificationHandle {
    tx: mpsc::Sender<NotificationEnvelope>,
}

impl NotificationHandle {
    pub fn new(tx: mpsc::Sender<NotificationEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an event, waiting for channel capacity.
    ///
    /// A closed channel is logged, never surfaced to the caller.
    pub async fn emit(&self, event: NotificationEvent) {
        let envelope = NotificationEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope).await {
            tracing::error!("Failed to emit notification: {}", e);
        }
    }

    /// Emit without waiting. Returns false if the event was dropped.
    pub fn try_emit(&self, event: NotificationEvent) -> bool {
        let envelope = NotificationEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Dropping notification: {}", e);
                false
            }
        }
    }
}
