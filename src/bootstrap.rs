use crate::application::services::*;
use crate::config::Config;
use crate::domain::ports::agent_directory::AgentDirectory;
use crate::domain::ports::conversation_repository::ConversationRepository;
use crate::domain::ports::event_bus::EventBus;
use crate::domain::ports::identity_verifier::IdentityVerifier;
use crate::domain::ports::knowledge_responder::KnowledgeResponder;
use crate::domain::ports::message_repository::MessageRepository;
use crate::domain::ports::operational_data_source::OperationalDataSource;
use crate::domain::ports::sentiment_analyzer::SentimentAnalyzer;
use crate::domain::ports::task_spawner::TaskSpawner;
use crate::domain::ports::ticket_repository::TicketRepository;
use crate::domain::ports::ticketing_system::TicketingSystem;
use crate::domain::ports::time_service::TimeService;
use crate::domain::services::IntentClassifier;
use crate::infrastructure::events::LocalEventBus;
use crate::infrastructure::http::middleware::AppState;
use crate::infrastructure::persistence::Database;
use crate::infrastructure::providers::*;
use crate::infrastructure::runtime::tokio::{SystemTimeService, TokioTaskSpawner};
use crate::infrastructure::workers::{EscalationNotifier, InactivitySweeper};
use std::sync::Arc;
use std::time::Duration;

/// External collaborators behind the domain ports. Tests swap individual
/// fields for fakes before calling [`build_services`].
#[derive(Clone)]
pub struct Collaborators {
    pub responder: Arc<dyn KnowledgeResponder>,
    pub data_source: Arc<dyn OperationalDataSource>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub sentiment: Arc<dyn SentimentAnalyzer>,
    pub ticketing: Arc<dyn TicketingSystem>,
    pub agents: Arc<dyn AgentDirectory>,
    pub clock: Arc<dyn TimeService>,
    pub event_bus: Arc<dyn EventBus>,
}

impl Collaborators {
    /// HTTP adapters where a URL is configured, local adapters otherwise.
    pub fn from_config(db: &Database, config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let clock: Arc<dyn TimeService> = Arc::new(SystemTimeService::new());

        let responder: Arc<dyn KnowledgeResponder> = match &config.ai_responder_url {
            Some(url) => {
                tracing::info!("AI responder: {}", url);
                Arc::new(HttpKnowledgeResponder::new(url)?)
            }
            None => {
                tracing::info!("AI responder: local knowledge templates");
                Arc::new(TemplateKnowledgeResponder::default())
            }
        };

        let data_source: Arc<dyn OperationalDataSource> = match &config.data_source_url {
            Some(url) => {
                tracing::info!("Operational data source: {}", url);
                Arc::new(HttpDataSource::new(url)?)
            }
            None => {
                tracing::info!("Operational data source: canned records");
                Arc::new(CannedDataSource::new())
            }
        };

        let tickets: Arc<dyn TicketRepository> = Arc::new(db.clone());

        Ok(Self {
            responder,
            data_source,
            verifier: Arc::new(DirectoryVerifier::new(config.identity_directory.clone())),
            sentiment: Arc::new(KeywordSentimentAnalyzer::new()),
            ticketing: Arc::new(LocalTicketingSystem::new(tickets, clock.clone())),
            agents: Arc::new(StaticAgentRoster::new(config.agent_roster.clone())),
            clock,
            event_bus: Arc::new(LocalEventBus::default()),
        })
    }
}

/// Wire the service graph over `db` and the given collaborators. Starts no
/// background work.
pub fn build_services(db: &Database, config: &Config, collaborators: &Collaborators) -> AppState {
    let conversation_repo: Arc<dyn ConversationRepository> = Arc::new(db.clone());
    let message_repo: Arc<dyn MessageRepository> = Arc::new(db.clone());
    let routing = &config.routing;

    let cache = Arc::new(CacheService::new(
        config.cache_ttl.clone(),
        collaborators.clock.clone(),
    ));
    let monitor = Arc::new(PerformanceMonitor::new(routing.slow_response_alert_ms));
    let auth = Arc::new(AuthGate::new(
        cache.clone(),
        collaborators.verifier.clone(),
        collaborators.clock.clone(),
        routing.auth_timeout,
        routing.retry_deadline_factor,
    ));
    let data = Arc::new(DataTemplateProvider::new(
        default_templates(),
        collaborators.data_source.clone(),
        routing.data_source_timeout,
        routing.retry_deadline_factor,
    ));
    let engine = Arc::new(RoutingEngine::new(
        Arc::new(IntentClassifier::with_default_catalog()),
        cache.clone(),
        data,
        auth.clone(),
        collaborators.responder.clone(),
        monitor.clone(),
        routing.clone(),
    ));

    let escalation = EscalationService::new(
        conversation_repo.clone(),
        collaborators.ticketing.clone(),
        collaborators.agents.clone(),
        collaborators.event_bus.clone(),
        collaborators.clock.clone(),
        monitor.clone(),
    );
    let conversation_service = ConversationService::new(
        conversation_repo,
        message_repo.clone(),
        Arc::new(ConversationLocks::new()),
        escalation,
        collaborators.event_bus.clone(),
        collaborators.clock.clone(),
        config.business_hours.clone(),
        auth,
        cache.clone(),
        config.inactivity_threshold(),
    );
    let message_service = MessageService::new(
        conversation_service.clone(),
        engine,
        message_repo,
        collaborators.sentiment.clone(),
        collaborators.clock.clone(),
        routing.data_source_timeout,
        routing.retry_deadline_factor,
        routing.fallback_escalation_threshold,
    );

    AppState {
        message_service,
        conversation_service,
        cache,
        monitor,
    }
}

/// Build the application state and start the background workers.
pub async fn build_app_state(
    db: Database,
    config: &Config,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let collaborators = Collaborators::from_config(&db, config)?;
    let state = build_services(&db, config, &collaborators);

    let task_spawner: Arc<dyn TaskSpawner> = Arc::new(TokioTaskSpawner::new());

    InactivitySweeper::new(
        state.conversation_service.clone(),
        collaborators.clock.clone(),
        Duration::from_secs(config.inactivity_sweep_interval_secs),
    )
    .start(task_spawner.as_ref());

    match &config.escalation_webhook_url {
        Some(url) => {
            EscalationNotifier::new(collaborators.event_bus.clone(), url)?
                .start(task_spawner.as_ref());
        }
        None => tracing::info!("Escalation webhook not configured; notifier disabled"),
    }

    Ok(state)
}
