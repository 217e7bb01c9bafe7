use crate::domain::entities::{Conversation, Ticket};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::ticket_repository::TicketRepository;
use crate::domain::ports::ticketing_system::TicketingSystem;
use crate::domain::ports::time_service::TimeService;
use async_trait::async_trait;
use std::sync::Arc;

/// Ticketing system that keeps tickets in the local database.
pub struct LocalTicketingSystem {
    tickets: Arc<dyn TicketRepository>,
    clock: Arc<dyn TimeService>,
}

impl LocalTicketingSystem {
    pub fn new(tickets: Arc<dyn TicketRepository>, clock: Arc<dyn TimeService>) -> Self {
        Self { tickets, clock }
    }
}

#[async_trait]
impl TicketingSystem for LocalTicketingSystem {
    async fn create_ticket(&self, conversation: &Conversation) -> DomainResult<Ticket> {
        // One ticket per conversation; reuse it if a previous attempt got this far
        if let Some(existing) = self
            .tickets
            .get_ticket_by_conversation(&conversation.id)
            .await?
        {
            return Ok(existing);
        }

        let now = self.clock.now();
        let ticket = Ticket {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            status: conversation.status,
            priority: conversation.priority,
            assignee: conversation.assigned_agent.clone(),
            department: conversation.department.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tickets.create_ticket(&ticket).await?;
        Ok(ticket)
    }

    async fn sync_ticket(&self, conversation: &Conversation) -> DomainResult<()> {
        let ticket_id = conversation.ticket_id.as_deref().ok_or_else(|| {
            DomainError::ValidationError(format!("Conversation {} has no ticket", conversation.id))
        })?;
        let mut ticket = self
            .tickets
            .get_ticket_by_id(ticket_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Ticket {} not found", ticket_id)))?;

        ticket.status = conversation.status;
        ticket.priority = conversation.priority;
        ticket.assignee = conversation.assigned_agent.clone();
        ticket.department = conversation.department.clone();
        ticket.updated_at = self.clock.now();
        self.tickets.update_ticket(&ticket).await
    }
}
