use crate::application::services::{
    CacheService, ConversationService, MessageService, PerformanceMonitor,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub message_service: MessageService,
    pub conversation_service: ConversationService,
    pub cache: Arc<CacheService>,
    pub monitor: Arc<PerformanceMonitor>,
}
