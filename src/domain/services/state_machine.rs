use crate::domain::entities::{Conversation, ConversationStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ConversationStatus,
        to: ConversationStatus,
    },
}

/// Context for a state transition, including metadata about who triggered it
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub to_status: ConversationStatus,
    pub agent_id: Option<String>,
    pub now: DateTime<Utc>,
}

impl TransitionContext {
    pub fn new(to_status: ConversationStatus, now: DateTime<Utc>) -> Self {
        Self {
            to_status,
            agent_id: None,
            now,
        }
    }

    pub fn by_agent(mut self, agent_id: &str) -> Self {
        self.agent_id = Some(agent_id.to_string());
        self
    }
}

/// Result of a state transition execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub from_status: ConversationStatus,
    pub new_status: ConversationStatus,
    /// False when the conversation was already in the target status.
    pub changed: bool,
}

/// Validates if a state transition is allowed.
///
/// Status only moves forward through the lifecycle. The single backward edge is
/// the reopen `Closed -> New`.
pub fn validate_transition(
    from: ConversationStatus,
    to: ConversationStatus,
) -> Result<(), TransitionError> {
    use ConversationStatus::*;

    match (from, to) {
        // Same state is always valid (no-op)
        (a, b) if a == b => Ok(()),

        (Closed, New) => Ok(()),
        (a, b) if b > a => Ok(()),

        _ => Err(TransitionError::InvalidTransition { from, to }),
    }
}

/// Apply a validated transition to `conversation` in place.
///
/// Every call touches `last_activity_at`, including same-state no-ops.
pub fn execute_transition(
    conversation: &mut Conversation,
    context: &TransitionContext,
) -> Result<TransitionResult, TransitionError> {
    let from = conversation.status;
    validate_transition(from, context.to_status)?;

    conversation.last_activity_at = context.now;
    if from == context.to_status {
        return Ok(TransitionResult {
            from_status: from,
            new_status: from,
            changed: false,
        });
    }

    tracing::info!(
        "Executing state transition for conversation {} from {} to {}",
        conversation.id,
        from,
        context.to_status
    );

    conversation.status = context.to_status;
    match context.to_status {
        ConversationStatus::Closed => {
            conversation.closed_at = Some(context.now);
        }
        ConversationStatus::New => {
            // Reopened: a fresh lifecycle, escalation bookkeeping is cleared
            conversation.closed_at = None;
            conversation.escalation_reason = None;
            conversation.escalated_at = None;
            conversation.handoff_pending = false;
        }
        ConversationStatus::AgentAssigned => {
            if let Some(agent_id) = &context.agent_id {
                conversation.assigned_agent = Some(agent_id.clone());
            }
        }
        _ => {}
    }

    Ok(TransitionResult {
        from_status: from,
        new_status: context.to_status,
        changed: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConversationStatus::*;

    fn conversation(status: ConversationStatus) -> Conversation {
        let mut conv = Conversation::new(
            "conv-1".to_string(),
            "web".to_string(),
            Some("cust-1".to_string()),
            None,
            false,
            Utc::now() - chrono::Duration::hours(1),
        );
        conv.status = status;
        conv
    }

    #[test]
    fn test_same_state_valid() {
        assert!(validate_transition(New, New).is_ok());
        assert!(validate_transition(Escalated, Escalated).is_ok());
    }

    #[test]
    fn test_forward_transitions_valid() {
        assert!(validate_transition(New, AiResponded).is_ok());
        assert!(validate_transition(New, AgentAssigned).is_ok());
        assert!(validate_transition(AiResponded, Escalated).is_ok());
        assert!(validate_transition(AgentAssigned, Escalated).is_ok());
        assert!(validate_transition(Escalated, Closed).is_ok());
    }

    #[test]
    fn test_reopen_valid() {
        assert!(validate_transition(Closed, New).is_ok());
    }

    #[test]
    fn test_backward_transitions_invalid() {
        assert_eq!(
            validate_transition(Escalated, AgentAssigned),
            Err(TransitionError::InvalidTransition {
                from: Escalated,
                to: AgentAssigned
            })
        );
        assert!(validate_transition(AgentAssigned, AiResponded).is_err());
        assert!(validate_transition(Closed, Escalated).is_err());
        assert!(validate_transition(AiResponded, New).is_err());
    }

    #[test]
    fn test_execute_updates_activity_and_closed_at() {
        let mut conv = conversation(AiResponded);
        let now = Utc::now();
        let result = execute_transition(&mut conv, &TransitionContext::new(Closed, now)).unwrap();
        assert!(result.changed);
        assert_eq!(conv.status, Closed);
        assert_eq!(conv.closed_at, Some(now));
        assert_eq!(conv.last_activity_at, now);
    }

    #[test]
    fn test_execute_reopen_clears_escalation() {
        let mut conv = conversation(Closed);
        conv.escalation_reason = Some("inactivity".to_string());
        conv.handoff_pending = true;
        let now = Utc::now();
        execute_transition(&mut conv, &TransitionContext::new(New, now)).unwrap();
        assert_eq!(conv.status, New);
        assert!(conv.escalation_reason.is_none());
        assert!(!conv.handoff_pending);
        assert!(conv.closed_at.is_none());
    }

    #[test]
    fn test_execute_assignment_records_agent() {
        let mut conv = conversation(New);
        let ctx = TransitionContext::new(AgentAssigned, Utc::now()).by_agent("agent-7");
        execute_transition(&mut conv, &ctx).unwrap();
        assert_eq!(conv.assigned_agent.as_deref(), Some("agent-7"));
    }

    #[test]
    fn test_execute_invalid_leaves_conversation_untouched() {
        let mut conv = conversation(Escalated);
        let before = conv.last_activity_at;
        let ctx = TransitionContext::new(AgentAssigned, Utc::now()).by_agent("agent-7");
        assert!(execute_transition(&mut conv, &ctx).is_err());
        assert_eq!(conv.status, Escalated);
        assert_eq!(conv.last_activity_at, before);
        assert!(conv.assigned_agent.is_none());
    }
}
