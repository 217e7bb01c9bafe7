use crate::domain::entities::{Conversation, Ticket};
use crate::domain::errors::DomainResult;
use async_trait::async_trait;

/// External ticketing system. Calls are best-effort from the caller's side.
#[async_trait]
pub trait TicketingSystem: Send + Sync {
    async fn create_ticket(&self, conversation: &Conversation) -> DomainResult<Ticket>;

    async fn sync_ticket(&self, conversation: &Conversation) -> DomainResult<()>;
}
