use crate::domain::events::SystemEvent;
use crate::domain::ports::event_bus::EventBus;
use crate::domain::ports::task_spawner::TaskSpawner;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

/// Forwards escalation and hand-off events to an external webhook so the
/// human side learns about them without polling.
#[derive(Clone)]
pub struct EscalationNotifier {
    event_bus: Arc<dyn EventBus>,
    http_client: Client,
    webhook_url: String,
}

impl EscalationNotifier {
    pub fn new(event_bus: Arc<dyn EventBus>, webhook_url: &str) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            event_bus,
            http_client,
            webhook_url: webhook_url.to_string(),
        })
    }

    /// Subscribe and forward until the bus closes.
    pub fn start(&self, spawner: &dyn TaskSpawner) {
        let notifier = self.clone();
        let mut stream = self.event_bus.subscribe();
        spawner.spawn(Box::pin(async move {
            info!("Escalation notifier forwarding to {}", notifier.webhook_url);
            while let Some(result) = stream.next().await {
                match result {
                    Ok(event) if is_notifiable(&event) => notifier.deliver(&event).await,
                    Ok(_) => {}
                    Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
                        warn!("Escalation notifier lagged behind by {} events", n);
                    }
                }
            }
            error!("EventBus closed, stopping escalation notifier");
        }));
    }

    async fn deliver(&self, event: &SystemEvent) {
        match self.http_client.post(&self.webhook_url).json(event).send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    "Escalation notification delivered for conversation {}",
                    event.conversation_id()
                );
            }
            Ok(response) => warn!(
                "Escalation webhook returned HTTP {} for conversation {}",
                response.status().as_u16(),
                event.conversation_id()
            ),
            Err(e) => warn!(
                "Escalation webhook delivery failed for conversation {}: {}",
                event.conversation_id(),
                e
            ),
        }
    }
}

pub fn is_notifiable(event: &SystemEvent) -> bool {
    matches!(
        event,
        SystemEvent::ConversationEscalated { .. } | SystemEvent::HandoffCompleted { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_escalation_events_are_forwarded() {
        let escalated = SystemEvent::ConversationEscalated {
            conversation_id: "c1".to_string(),
            reason: "inactivity".to_string(),
            department: "support".to_string(),
            priority: crate::domain::entities::Priority::Medium,
            handoff_pending: true,
            timestamp: "2024-01-01T00:00:00.000000Z".to_string(),
        };
        let received = SystemEvent::MessageReceived {
            message_id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            intent: None,
            timestamp: "2024-01-01T00:00:00.000000Z".to_string(),
        };
        assert!(is_notifiable(&escalated));
        assert!(!is_notifiable(&received));
    }
}
