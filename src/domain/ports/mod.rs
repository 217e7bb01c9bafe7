pub mod agent_directory;
pub mod conversation_repository;
pub mod event_bus;
pub mod identity_verifier;
pub mod knowledge_responder;
pub mod message_repository;
pub mod operational_data_source;
pub mod sentiment_analyzer;
pub mod task_spawner;
pub mod ticket_repository;
pub mod ticketing_system;
pub mod time_service;
