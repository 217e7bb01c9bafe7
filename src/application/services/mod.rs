pub mod auth_gate;
pub mod cache_service;
pub mod conversation_locks;
pub mod conversation_service;
pub mod data_template_provider;
pub mod escalation_service;
pub mod message_service;
pub mod performance_monitor;
pub mod routing_engine;
pub mod upstream;

pub use auth_gate::AuthGate;
pub use cache_service::CacheService;
pub use conversation_locks::ConversationLocks;
pub use conversation_service::{ConversationService, LogoutResponse, SweepReport};
pub use data_template_provider::{default_templates, DataTemplate, DataTemplateProvider, LiveDataAnswer};
pub use escalation_service::EscalationService;
pub use message_service::MessageService;
pub use performance_monitor::{PerformanceMonitor, PerformanceSnapshot};
pub use routing_engine::{RoutingEngine, RoutingRequest};
