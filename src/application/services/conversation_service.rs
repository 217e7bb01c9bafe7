use crate::application::services::auth_gate::AuthGate;
use crate::application::services::cache_service::CacheService;
use crate::application::services::conversation_locks::ConversationLocks;
use crate::application::services::escalation_service::EscalationService;
use crate::domain::entities::{
    format_timestamp, AiMode, Conversation, ConversationFilter, ConversationListResponse,
    ConversationStatus, EscalateRequest, Message, UserContext,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::SystemEvent;
use crate::domain::ports::conversation_repository::ConversationRepository;
use crate::domain::ports::event_bus::EventBus;
use crate::domain::ports::message_repository::MessageRepository;
use crate::domain::ports::time_service::TimeService;
use crate::domain::services::business_hours::BusinessHours;
use crate::domain::services::escalation_policy::reasons;
use crate::domain::services::state_machine::{execute_transition, TransitionContext};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

const DEFAULT_MESSAGE_LIMIT: i64 = 50;
const MAX_MESSAGE_LIMIT: i64 = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub escalated: usize,
    pub handoffs_completed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    pub conversation_id: String,
    pub invalidated_entries: usize,
}

/// Conversation management: lookups, assignment, escalation, AI mode, close,
/// and the inactivity sweep.
///
/// Mutations take the per-conversation lock, re-read the record, apply the
/// state machine, and write back with a version check.
#[derive(Clone)]
pub struct ConversationService {
    conversation_repo: Arc<dyn ConversationRepository>,
    message_repo: Arc<dyn MessageRepository>,
    locks: Arc<ConversationLocks>,
    escalation: EscalationService,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn TimeService>,
    business_hours: BusinessHours,
    auth: Arc<AuthGate>,
    cache: Arc<CacheService>,
    inactivity_threshold: chrono::Duration,
}

impl ConversationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepository>,
        message_repo: Arc<dyn MessageRepository>,
        locks: Arc<ConversationLocks>,
        escalation: EscalationService,
        event_bus: Arc<dyn EventBus>,
        clock: Arc<dyn TimeService>,
        business_hours: BusinessHours,
        auth: Arc<AuthGate>,
        cache: Arc<CacheService>,
        inactivity_threshold: chrono::Duration,
    ) -> Self {
        Self {
            conversation_repo,
            message_repo,
            locks,
            escalation,
            event_bus,
            clock,
            business_hours,
            auth,
            cache,
            inactivity_threshold,
        }
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> DomainResult<Conversation> {
        self.conversation_repo
            .get_conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Conversation {} not found", conversation_id)))
    }

    pub async fn get_conversations(
        &self,
        filter: ConversationFilter,
    ) -> DomainResult<ConversationListResponse> {
        let conversations = self.conversation_repo.list_conversations(&filter).await?;
        let total_count = self.conversation_repo.count_conversations(&filter).await?;
        Ok(ConversationListResponse {
            conversations,
            total_count,
        })
    }

    /// The latest `limit` messages of a conversation, oldest first.
    pub async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> DomainResult<Vec<Message>> {
        let limit = limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);
        if !(1..=MAX_MESSAGE_LIMIT).contains(&limit) {
            return Err(DomainError::ValidationError(format!(
                "limit must be between 1 and {}",
                MAX_MESSAGE_LIMIT
            )));
        }
        self.get_conversation(conversation_id).await?;
        self.message_repo.get_messages(conversation_id, limit).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn assign(&self, conversation_id: &str, agent_id: &str) -> DomainResult<Conversation> {
        let agent_id = agent_id.trim();
        if agent_id.is_empty() {
            return Err(DomainError::ValidationError("agent_id must not be empty".to_string()));
        }

        let _guard = self.lock(conversation_id).await;
        let mut conversation = self.get_conversation(conversation_id).await?;
        if conversation.status == ConversationStatus::AgentAssigned
            && conversation.assigned_agent.as_deref() == Some(agent_id)
        {
            return Ok(conversation);
        }

        // Reassignment within AgentAssigned is a same-state transition
        conversation.assigned_agent = Some(agent_id.to_string());
        let context = TransitionContext::new(ConversationStatus::AgentAssigned, self.clock.now())
            .by_agent(agent_id);
        let conversation = self.apply_transition(conversation, &context).await?;

        self.publish(SystemEvent::ConversationAssigned {
            conversation_id: conversation.id.clone(),
            agent_id: agent_id.to_string(),
            timestamp: format_timestamp(&context.now),
        });
        Ok(conversation)
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn escalate(
        &self,
        conversation_id: &str,
        request: EscalateRequest,
    ) -> DomainResult<Conversation> {
        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(reasons::MANUAL)
            .to_string();

        let _guard = self.lock(conversation_id).await;
        let conversation = self.get_conversation(conversation_id).await?;
        self.escalation
            .escalate(
                conversation,
                &reason,
                request.priority,
                request.assignee.as_deref(),
            )
            .await
    }

    /// Set the AI mode. Setting the current mode is a no-op and emits nothing.
    #[tracing::instrument(skip(self))]
    pub async fn set_ai_mode(&self, conversation_id: &str, mode: AiMode) -> DomainResult<Conversation> {
        let _guard = self.lock(conversation_id).await;
        let mut conversation = self.get_conversation(conversation_id).await?;
        if conversation.ai_mode == mode {
            return Ok(conversation);
        }

        let old_mode = conversation.ai_mode;
        let now = self.clock.now();
        conversation.ai_mode = mode;
        conversation.last_activity_at = now;
        let conversation = self.conversation_repo.update_conversation(&conversation).await?;

        tracing::info!(
            "AI mode for conversation {} changed from {} to {}",
            conversation_id,
            old_mode,
            mode
        );
        self.publish(SystemEvent::AiModeChanged {
            conversation_id: conversation.id.clone(),
            old_mode,
            new_mode: mode,
            timestamp: format_timestamp(&now),
        });
        Ok(conversation)
    }

    #[tracing::instrument(skip(self))]
    pub async fn close(&self, conversation_id: &str) -> DomainResult<Conversation> {
        let _guard = self.lock(conversation_id).await;
        let conversation = self.get_conversation(conversation_id).await?;
        if conversation.status == ConversationStatus::Closed {
            return Ok(conversation);
        }
        let context = TransitionContext::new(ConversationStatus::Closed, self.clock.now());
        self.apply_transition(conversation, &context).await
    }

    /// Clear verification state and cached per-user data for a conversation.
    /// Cache invalidation is best-effort; the count is what was removed.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self, conversation_id: &str) -> DomainResult<LogoutResponse> {
        let conversation = self.get_conversation(conversation_id).await?;

        let subject = self.auth.verified_subject(conversation_id);
        self.auth.logout(conversation_id);

        let mut invalidated_entries = 0;
        let users = [subject, conversation.customer_id];
        for user in users.iter().flatten() {
            invalidated_entries += self.cache.invalidate_user(user);
        }

        Ok(LogoutResponse {
            conversation_id: conversation_id.to_string(),
            invalidated_entries,
        })
    }

    /// Escalate unresolved conversations idle past the threshold and retry
    /// deferred hand-offs. Safe to run repeatedly and alongside live traffic.
    pub async fn sweep_inactive(&self) -> DomainResult<SweepReport> {
        let mut report = SweepReport::default();
        let cutoff = self.clock.now() - self.inactivity_threshold;

        for candidate in self.conversation_repo.find_inactive_conversations(cutoff).await? {
            let _guard = self.lock(&candidate.id).await;
            // Re-read: live traffic may have touched it since the scan
            let conversation = match self.get_conversation(&candidate.id).await {
                Ok(conversation) => conversation,
                Err(e) => {
                    tracing::warn!("Inactivity sweep skipped {}: {}", candidate.id, e);
                    continue;
                }
            };
            if !conversation.status.is_unresolved() || conversation.last_activity_at >= cutoff {
                continue;
            }

            match self
                .escalation
                .escalate(conversation, reasons::INACTIVITY, None, None)
                .await
            {
                Ok(_) => report.escalated += 1,
                Err(e) => tracing::warn!("Inactivity escalation failed for {}: {}", candidate.id, e),
            }
        }

        for candidate in self.conversation_repo.find_pending_handoffs().await? {
            let _guard = self.lock(&candidate.id).await;
            let conversation = match self.get_conversation(&candidate.id).await {
                Ok(conversation) => conversation,
                Err(e) => {
                    tracing::warn!("Hand-off retry skipped {}: {}", candidate.id, e);
                    continue;
                }
            };
            match self.escalation.retry_handoff(conversation).await {
                Ok(updated) if !updated.handoff_pending => report.handoffs_completed += 1,
                Ok(_) => {}
                Err(e) => tracing::warn!("Hand-off retry failed for {}: {}", candidate.id, e),
            }
        }

        let pruned = self.locks.prune();
        if report.escalated > 0 || report.handoffs_completed > 0 {
            tracing::info!(
                "Inactivity sweep: {} escalated, {} hand-offs completed, {} idle locks pruned",
                report.escalated,
                report.handoffs_completed,
                pruned
            );
        }
        Ok(report)
    }

    pub(crate) async fn lock(&self, conversation_id: &str) -> OwnedMutexGuard<()> {
        self.locks.lock(conversation_id).await
    }

    pub(crate) fn escalation(&self) -> &EscalationService {
        &self.escalation
    }

    /// Load a conversation, creating it on first contact. Caller holds the lock.
    pub(crate) async fn load_or_create(
        &self,
        conversation_id: &str,
        user_context: &UserContext,
    ) -> DomainResult<Conversation> {
        if let Some(conversation) = self
            .conversation_repo
            .get_conversation_by_id(conversation_id)
            .await?
        {
            return Ok(conversation);
        }

        let now = self.clock.now();
        let conversation = Conversation::new(
            conversation_id.to_string(),
            user_context
                .channel
                .clone()
                .unwrap_or_else(|| "web".to_string()),
            user_context.user_id.clone(),
            user_context.role.clone(),
            self.business_hours.is_after_hours(now),
            now,
        );
        self.conversation_repo.create_conversation(&conversation).await?;
        self.publish(SystemEvent::ConversationCreated {
            conversation_id: conversation.id.clone(),
            channel: conversation.channel.clone(),
            is_after_hours: conversation.is_after_hours,
            timestamp: format_timestamp(&now),
        });
        Ok(conversation)
    }

    /// Run a state transition, persist it, publish the change and mirror it
    /// to the ticket. Caller holds the lock.
    pub(crate) async fn apply_transition(
        &self,
        mut conversation: Conversation,
        context: &TransitionContext,
    ) -> DomainResult<Conversation> {
        let result = execute_transition(&mut conversation, context)
            .map_err(|e| DomainError::Conflict(e.to_string()))?;
        let conversation = self.conversation_repo.update_conversation(&conversation).await?;

        if result.changed {
            self.publish(SystemEvent::ConversationStatusChanged {
                conversation_id: conversation.id.clone(),
                old_status: result.from_status,
                new_status: result.new_status,
                agent_id: context.agent_id.clone(),
                timestamp: format_timestamp(&context.now),
            });
        }
        self.escalation.sync_ticket(&conversation).await;
        Ok(conversation)
    }

    /// Record activity without a status change. Caller holds the lock.
    pub(crate) async fn touch(
        &self,
        mut conversation: Conversation,
        at: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<Conversation> {
        if at > conversation.last_activity_at {
            conversation.last_activity_at = at;
        }
        self.conversation_repo.update_conversation(&conversation).await
    }

    pub(crate) fn publish(&self, event: SystemEvent) {
        if let Err(e) = self.event_bus.publish(event) {
            tracing::warn!("Failed to publish event: {}", e);
        }
    }
}
