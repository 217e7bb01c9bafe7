use crate::application::services::performance_monitor::PerformanceMonitor;
use crate::domain::entities::{format_timestamp, Conversation, ConversationStatus, Priority};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::SystemEvent;
use crate::domain::ports::agent_directory::AgentDirectory;
use crate::domain::ports::conversation_repository::ConversationRepository;
use crate::domain::ports::event_bus::EventBus;
use crate::domain::ports::ticketing_system::TicketingSystem;
use crate::domain::ports::time_service::TimeService;
use crate::domain::services::escalation_policy::{resolve_escalation, DEFAULT_DEPARTMENT};
use crate::domain::services::state_machine::{execute_transition, TransitionContext};
use std::sync::Arc;

/// Escalation and human hand-off.
///
/// Every method here expects the caller to hold the conversation's lock and
/// to pass in a freshly read conversation.
#[derive(Clone)]
pub struct EscalationService {
    conversation_repo: Arc<dyn ConversationRepository>,
    ticketing: Arc<dyn TicketingSystem>,
    agents: Arc<dyn AgentDirectory>,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn TimeService>,
    monitor: Arc<PerformanceMonitor>,
}

impl EscalationService {
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepository>,
        ticketing: Arc<dyn TicketingSystem>,
        agents: Arc<dyn AgentDirectory>,
        event_bus: Arc<dyn EventBus>,
        clock: Arc<dyn TimeService>,
        monitor: Arc<PerformanceMonitor>,
    ) -> Self {
        Self {
            conversation_repo,
            ticketing,
            agents,
            event_bus,
            clock,
            monitor,
        }
    }

    /// Escalate a conversation.
    ///
    /// Escalating an already escalated conversation never re-escalates: it
    /// only raises the priority when a higher one is requested and retries a
    /// pending hand-off.
    #[tracing::instrument(skip(self, conversation), fields(conversation_id = %conversation.id))]
    pub async fn escalate(
        &self,
        mut conversation: Conversation,
        reason: &str,
        requested_priority: Option<Priority>,
        assignee: Option<&str>,
    ) -> DomainResult<Conversation> {
        if conversation.status == ConversationStatus::Escalated {
            if let Some(requested) = requested_priority.filter(|p| *p > conversation.priority) {
                conversation.priority = requested;
                conversation.last_activity_at = self.clock.now();
                conversation = self.conversation_repo.update_conversation(&conversation).await?;
                self.sync_ticket(&conversation).await;
            }
            if conversation.handoff_pending || assignee.is_some() {
                return self.attempt_handoff(conversation, assignee).await;
            }
            return Ok(conversation);
        }

        let now = self.clock.now();
        let target = resolve_escalation(
            reason,
            conversation.priority,
            requested_priority,
            conversation.is_after_hours,
        );
        let result = execute_transition(
            &mut conversation,
            &TransitionContext::new(ConversationStatus::Escalated, now),
        )
        .map_err(|e| DomainError::Conflict(e.to_string()))?;

        conversation.priority = target.priority;
        conversation.department = Some(target.department.clone());
        conversation.escalation_reason = Some(reason.to_string());
        conversation.escalated_at = Some(now);
        conversation.handoff_pending = true;
        let conversation = self.conversation_repo.update_conversation(&conversation).await?;

        tracing::info!(
            "Conversation {} escalated: reason={}, department={}, priority={}",
            conversation.id,
            reason,
            target.department,
            target.priority
        );
        self.monitor.record_escalation(reason);
        self.publish(SystemEvent::ConversationStatusChanged {
            conversation_id: conversation.id.clone(),
            old_status: result.from_status,
            new_status: result.new_status,
            agent_id: None,
            timestamp: format_timestamp(&now),
        });
        self.publish(SystemEvent::ConversationEscalated {
            conversation_id: conversation.id.clone(),
            reason: reason.to_string(),
            department: target.department,
            priority: target.priority,
            handoff_pending: true,
            timestamp: format_timestamp(&now),
        });

        self.attempt_handoff(conversation, assignee).await
    }

    /// Retry a deferred hand-off. A no-op unless the conversation is escalated
    /// with a hand-off still pending.
    pub async fn retry_handoff(&self, conversation: Conversation) -> DomainResult<Conversation> {
        if conversation.status != ConversationStatus::Escalated || !conversation.handoff_pending {
            return Ok(conversation);
        }
        self.attempt_handoff(conversation, None).await
    }

    /// Best-effort mirror of the conversation into its ticket.
    pub async fn sync_ticket(&self, conversation: &Conversation) {
        if conversation.ticket_id.is_none() {
            return;
        }
        if let Err(e) = self.ticketing.sync_ticket(conversation).await {
            tracing::warn!(
                "Ticket sync failed for conversation {}: {}",
                conversation.id,
                e
            );
        }
    }

    async fn attempt_handoff(
        &self,
        mut conversation: Conversation,
        assignee: Option<&str>,
    ) -> DomainResult<Conversation> {
        let mut dirty = false;

        if conversation.ticket_id.is_none() {
            match self.ticketing.create_ticket(&conversation).await {
                Ok(ticket) => {
                    tracing::info!(
                        "Ticket {} opened for conversation {}",
                        ticket.id,
                        conversation.id
                    );
                    conversation.ticket_id = Some(ticket.id);
                    dirty = true;
                }
                Err(e) => {
                    tracing::warn!(
                        "Hand-off deferred for conversation {}: ticket creation failed: {}",
                        conversation.id,
                        e
                    );
                    return Ok(conversation);
                }
            }
        }

        let department = conversation
            .department
            .clone()
            .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string());
        let agent = match assignee {
            Some(agent) => Some(agent.to_string()),
            None => self.agents.find_available_agent(&department).await,
        };

        let Some(agent) = agent else {
            tracing::warn!(
                "Hand-off deferred for conversation {}: no agent available in {}",
                conversation.id,
                department
            );
            if dirty {
                conversation = self.conversation_repo.update_conversation(&conversation).await?;
            }
            return Ok(conversation);
        };

        let now = self.clock.now();
        conversation.assigned_agent = Some(agent.clone());
        conversation.handoff_pending = false;
        conversation.last_activity_at = now;
        let conversation = self.conversation_repo.update_conversation(&conversation).await?;

        tracing::info!(
            "Conversation {} handed off to {} ({})",
            conversation.id,
            agent,
            department
        );
        self.publish(SystemEvent::ConversationAssigned {
            conversation_id: conversation.id.clone(),
            agent_id: agent.clone(),
            timestamp: format_timestamp(&now),
        });
        if let Some(ticket_id) = &conversation.ticket_id {
            self.publish(SystemEvent::HandoffCompleted {
                conversation_id: conversation.id.clone(),
                agent_id: agent,
                ticket_id: ticket_id.clone(),
                timestamp: format_timestamp(&now),
            });
        }
        self.sync_ticket(&conversation).await;

        Ok(conversation)
    }

    fn publish(&self, event: SystemEvent) {
        if let Err(e) = self.event_bus.publish(event) {
            tracing::warn!("Failed to publish event: {}", e);
        }
    }
}
