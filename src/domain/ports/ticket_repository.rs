use crate::domain::entities::Ticket;
use crate::domain::errors::DomainResult;

#[async_trait::async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create_ticket(&self, ticket: &Ticket) -> DomainResult<()>;

    async fn get_ticket_by_id(&self, id: &str) -> DomainResult<Option<Ticket>>;

    async fn get_ticket_by_conversation(&self, conversation_id: &str) -> DomainResult<Option<Ticket>>;

    async fn update_ticket(&self, ticket: &Ticket) -> DomainResult<()>;
}
