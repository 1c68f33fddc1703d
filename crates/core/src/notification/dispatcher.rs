use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::mpsc;

use super::{NotificationEnvelope, NotificationHandle};
use crate::config::NotificationsConfig;

/// Delivery failure of a single agent.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Receiver rejected notification ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// A destination for notification events.
#[async_trait]
pub trait NotificationAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, envelope: &NotificationEnvelope) -> Result<(), NotificationError>;
}

/// Writes events to the log.
pub struct LogAgent;

#[async_trait]
impl NotificationAgent for LogAgent {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, envelope: &NotificationEnvelope) -> Result<(), NotificationError> {
        tracing::info!(
            event_type = envelope.event.event_type(),
            media_id = ?envelope.event.media_id(),
            "Notification"
        );
        Ok(())
    }
}

/// POSTs events as JSON to a URL.
pub struct WebhookAgent {
    client: Client,
    url: String,
}

impl WebhookAgent {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl NotificationAgent for WebhookAgent {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, envelope: &NotificationEnvelope) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| NotificationError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// Background task fanning events out to every agent
pub struct NotificationDispatcher {
    rx: mpsc::Receiver<NotificationEnvelope>,
    agents: Vec<Arc<dyn NotificationAgent>>,
}

impl NotificationDispatcher {
    pub fn new(
        rx: mpsc::Receiver<NotificationEnvelope>,
        agents: Vec<Arc<dyn NotificationAgent>>,
    ) -> Self {
        Self { rx, agents }
    }

    /// Run until every handle is dropped.
    ///
    /// Spawn with `tokio::spawn(dispatcher.run())`.
    pub async fn run(mut self) {
        tracing::info!(agents = self.agents.len(), "Notification dispatcher started");

        while let Some(envelope) = self.rx.recv().await {
            for agent in &self.agents {
                if let Err(e) = agent.send(&envelope).await {
                    tracing::warn!(
                        agent = agent.name(),
                        event_type = envelope.event.event_type(),
                        error = %e,
                        "Failed to deliver notification"
                    );
                }
            }
        }

        tracing::info!("Notification dispatcher shutting down");
    }
}

/// Build the agents enabled by configuration.
pub fn agents_from_config(config: &NotificationsConfig) -> Vec<Arc<dyn NotificationAgent>> {
    let mut agents: Vec<Arc<dyn NotificationAgent>> = Vec::new();
    if config.log_events {
        agents.push(Arc::new(LogAgent));
    }
    if let Some(url) = config.webhook_url.as_deref().filter(|u| !u.is_empty()) {
        agents.push(Arc::new(WebhookAgent::new(url)));
    }
    agents
}

/// Create a complete notification system
///
/// Returns the handle (clone it freely) and the dispatcher to spawn.
pub fn create_notification_system(
    agents: Vec<Arc<dyn NotificationAgent>>,
    buffer_size: usize,
) -> (NotificationHandle, NotificationDispatcher) {
    let (tx, rx) = mpsc::channel(buffer_size.max(1));
    let handle = NotificationHandle::new(tx);
    let dispatcher = NotificationDispatcher::new(rx, agents);
    (handle, dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationEvent;
    use crate::testing::RecordingAgent;

    fn completed(request_id: i64) -> NotificationEvent {
        NotificationEvent::RequestCompleted {
            request_id,
            media_id: 1,
            requested_by: 1,
            is_alt: false,
        }
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_to_all_agents() {
        let first = Arc::new(RecordingAgent::new());
        let second = Arc::new(RecordingAgent::new());
        let (handle, dispatcher) =
            create_notification_system(vec![first.clone(), second.clone()], 8);
        let task = tokio::spawn(dispatcher.run());

        handle.emit(completed(1)).await;
        handle.emit(completed(2)).await;
        drop(handle);
        task.await.unwrap();

        assert_eq!(first.events().await.len(), 2);
        assert_eq!(second.events().await, vec![completed(1), completed(2)]);
    }

    #[tokio::test]
    async fn test_failing_agent_does_not_block_others() {
        let failing = Arc::new(RecordingAgent::new());
        failing.set_fail(true).await;
        let healthy = Arc::new(RecordingAgent::new());
        let (handle, dispatcher) =
            create_notification_system(vec![failing.clone(), healthy.clone()], 8);
        let task = tokio::spawn(dispatcher.run());

        handle.emit(completed(5)).await;
        drop(handle);
        task.await.unwrap();

        assert!(failing.events().await.is_empty());
        assert_eq!(healthy.events().await, vec![completed(5)]);
    }

    #[test]
    fn test_agents_from_config() {
        let mut config = NotificationsConfig::default();
        assert_eq!(agents_from_config(&config).len(), 1);

        config.webhook_url = Some("http://localhost:9999/hook".to_string());
        let agents = agents_from_config(&config);
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[1].name(), "webhook");

        config.log_events = false;
        config.webhook_url = Some(String::new());
        assert!(agents_from_config(&config).is_empty());
    }
}
