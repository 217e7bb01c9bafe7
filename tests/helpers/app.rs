use super::clock::ManualClock;
use super::test_db::setup_test_db;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use support_router::bootstrap::{build_services, Collaborators};
use support_router::config::Config;
use support_router::domain::entities::{ProcessMessageRequest, ProcessMessageResponse, UserContext};
use support_router::domain::ports::knowledge_responder::KnowledgeResponder;
use support_router::domain::ports::operational_data_source::OperationalDataSource;
use support_router::domain::ports::ticket_repository::TicketRepository;
use support_router::domain::ports::ticketing_system::TicketingSystem;
use support_router::infrastructure::events::LocalEventBus;
use support_router::infrastructure::http::AppState;
use support_router::infrastructure::persistence::Database;
use support_router::infrastructure::providers::{
    CannedDataSource, DirectoryVerifier, KeywordSentimentAnalyzer, LocalTicketingSystem,
    StaticAgentRoster, TemplateKnowledgeResponder,
};

pub const MEMBER_ID: &str = "AB123456";
pub const MEMBER_SUBJECT: &str = "cust-1";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.routing.ai_timeout = Duration::from_millis(100);
    config.routing.data_source_timeout = Duration::from_millis(100);
    config.routing.auth_timeout = Duration::from_millis(100);
    config
        .identity_directory
        .insert(MEMBER_ID.to_string(), MEMBER_SUBJECT.to_string());
    config
}

pub struct TestApp {
    pub db: Database,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub event_bus: Arc<LocalEventBus>,
}

impl TestApp {
    pub async fn new() -> Self {
        TestAppBuilder::default().build().await
    }

    pub fn builder() -> TestAppBuilder {
        TestAppBuilder::default()
    }

    pub async fn send(&self, conversation_id: &str, text: &str) -> ProcessMessageResponse {
        self.send_as(conversation_id, text, UserContext::anonymous("web"))
            .await
    }

    pub async fn send_as(
        &self,
        conversation_id: &str,
        text: &str,
        user_context: UserContext,
    ) -> ProcessMessageResponse {
        self.state
            .message_service
            .process_message(
                conversation_id,
                ProcessMessageRequest {
                    text: text.to_string(),
                    user_context,
                },
            )
            .await
    }
}

type TicketingFactory = Box<dyn FnOnce(Arc<dyn TicketingSystem>) -> Arc<dyn TicketingSystem>>;

#[derive(Default)]
pub struct TestAppBuilder {
    config: Option<Config>,
    responder: Option<Arc<dyn KnowledgeResponder>>,
    data_source: Option<Arc<dyn OperationalDataSource>>,
    ticketing: Option<TicketingFactory>,
    roster: BTreeMap<String, Vec<String>>,
}

impl TestAppBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn responder(mut self, responder: Arc<dyn KnowledgeResponder>) -> Self {
        self.responder = Some(responder);
        self
    }

    pub fn data_source(mut self, source: Arc<dyn OperationalDataSource>) -> Self {
        self.data_source = Some(source);
        self
    }

    /// Wrap the local ticketing system, e.g. with a failing fake.
    pub fn ticketing(
        mut self,
        wrap: impl FnOnce(Arc<dyn TicketingSystem>) -> Arc<dyn TicketingSystem> + 'static,
    ) -> Self {
        self.ticketing = Some(Box::new(wrap));
        self
    }

    pub fn agents(mut self, department: &str, agents: &[&str]) -> Self {
        self.roster.insert(
            department.to_string(),
            agents.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    pub async fn build(self) -> TestApp {
        let db = setup_test_db().await;
        let config = self.config.unwrap_or_else(test_config);
        let clock = Arc::new(ManualClock::business_hours());
        let event_bus = Arc::new(LocalEventBus::default());

        let tickets: Arc<dyn TicketRepository> = Arc::new(db.clone());
        let local_ticketing: Arc<dyn TicketingSystem> =
            Arc::new(LocalTicketingSystem::new(tickets, clock.clone()));
        let ticketing = match self.ticketing {
            Some(wrap) => wrap(local_ticketing),
            None => local_ticketing,
        };

        let collaborators = Collaborators {
            responder: self
                .responder
                .unwrap_or_else(|| Arc::new(TemplateKnowledgeResponder::default())),
            data_source: self
                .data_source
                .unwrap_or_else(|| Arc::new(CannedDataSource::new())),
            verifier: Arc::new(DirectoryVerifier::new(config.identity_directory.clone())),
            sentiment: Arc::new(KeywordSentimentAnalyzer::new()),
            ticketing,
            agents: Arc::new(StaticAgentRoster::new(self.roster)),
            clock: clock.clone(),
            event_bus: event_bus.clone(),
        };

        let state = build_services(&db, &config, &collaborators);

        TestApp {
            db,
            state,
            clock,
            event_bus,
        }
    }
}
