//! Notification agent that records what it receives.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::notification::{
    NotificationAgent, NotificationEnvelope, NotificationError, NotificationEvent,
};

/// Records delivered events; can be switched to reject every delivery.
#[derive(Default)]
pub struct RecordingAgent {
    events: Arc<RwLock<Vec<NotificationEvent>>>,
    fail: Arc<RwLock<bool>>,
}

impl RecordingAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events delivered so far, in order.
    pub async fn events(&self) -> Vec<NotificationEvent> {
        self.events.read().await.clone()
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }
}

#[async_trait]
impl NotificationAgent for RecordingAgent {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, envelope: &NotificationEnvelope) -> Result<(), NotificationError> {
        if *self.fail.read().await {
            return Err(NotificationError::Rejected {
                status: 500,
                message: "recording agent set to fail".to_string(),
            });
        }
        self.events.write().await.push(envelope.event.clone());
        Ok(())
    }
}
