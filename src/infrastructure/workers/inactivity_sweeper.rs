use crate::application::services::{ConversationService, SweepReport};
use crate::domain::errors::DomainResult;
use crate::domain::ports::task_spawner::TaskSpawner;
use crate::domain::ports::time_service::TimeService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Periodically escalates idle conversations and retries deferred hand-offs.
#[derive(Clone)]
pub struct InactivitySweeper {
    conversations: ConversationService,
    time_service: Arc<dyn TimeService>,
    interval: Duration,
}

impl InactivitySweeper {
    pub fn new(
        conversations: ConversationService,
        time_service: Arc<dyn TimeService>,
        interval: Duration,
    ) -> Self {
        Self {
            conversations,
            time_service,
            interval,
        }
    }

    pub async fn run_once(&self) -> DomainResult<SweepReport> {
        self.conversations.sweep_inactive().await
    }

    pub async fn run(&self) {
        info!(
            "Inactivity sweeper started (every {}s)",
            self.interval.as_secs()
        );
        loop {
            if let Err(e) = self.run_once().await {
                error!("Inactivity sweep failed: {}", e);
            }
            self.time_service.sleep(self.interval).await;
        }
    }

    pub fn start(&self, spawner: &dyn TaskSpawner) {
        let sweeper = self.clone();
        spawner.spawn(Box::pin(async move { sweeper.run().await }));
    }
}
