use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use support_router::domain::entities::{Conversation, Ticket};
use support_router::domain::errors::{DomainError, DomainResult, UpstreamError};
use support_router::domain::ports::knowledge_responder::{KnowledgeRequest, KnowledgeResponder};
use support_router::domain::ports::ticketing_system::TicketingSystem;

/// Responder that never answers.
pub struct HangingResponder;

#[async_trait]
impl KnowledgeResponder for HangingResponder {
    async fn respond(&self, _request: &KnowledgeRequest) -> Result<String, UpstreamError> {
        std::future::pending().await
    }
}

/// Responder that counts calls and answers with a fixed text.
#[derive(Default)]
pub struct CountingResponder {
    pub calls: AtomicUsize,
}

impl CountingResponder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeResponder for CountingResponder {
    async fn respond(&self, request: &KnowledgeRequest) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("answer for {}", request.intent))
    }
}

/// Ticketing that fails until `recover` is called, then delegates.
pub struct FlakyTicketing {
    inner: Arc<dyn TicketingSystem>,
    healthy: AtomicBool,
}

impl FlakyTicketing {
    pub fn failing(inner: Arc<dyn TicketingSystem>) -> Self {
        Self {
            inner,
            healthy: AtomicBool::new(false),
        }
    }

    pub fn recover(&self) {
        self.healthy.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TicketingSystem for FlakyTicketing {
    async fn create_ticket(&self, conversation: &Conversation) -> DomainResult<Ticket> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("ticketing offline".to_string()));
        }
        self.inner.create_ticket(conversation).await
    }

    async fn sync_ticket(&self, conversation: &Conversation) -> DomainResult<()> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("ticketing offline".to_string()));
        }
        self.inner.sync_ticket(conversation).await
    }
}
