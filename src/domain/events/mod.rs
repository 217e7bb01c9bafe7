use crate::domain::entities::{AiMode, ConversationStatus, Priority};
use serde::Serialize;

/// Events published on the system bus after state changes are persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SystemEvent {
    ConversationCreated {
        conversation_id: String,
        channel: String,
        is_after_hours: bool,
        timestamp: String, // ISO 8601
    },
    ConversationStatusChanged {
        conversation_id: String,
        old_status: ConversationStatus,
        new_status: ConversationStatus,
        agent_id: Option<String>,
        timestamp: String, // ISO 8601
    },
    ConversationAssigned {
        conversation_id: String,
        agent_id: String,
        timestamp: String, // ISO 8601
    },
    ConversationEscalated {
        conversation_id: String,
        reason: String,
        department: String,
        priority: Priority,
        handoff_pending: bool,
        timestamp: String, // ISO 8601
    },
    HandoffCompleted {
        conversation_id: String,
        agent_id: String,
        ticket_id: String,
        timestamp: String, // ISO 8601
    },
    AiModeChanged {
        conversation_id: String,
        old_mode: AiMode,
        new_mode: AiMode,
        timestamp: String, // ISO 8601
    },
    MessageReceived {
        message_id: String,
        conversation_id: String,
        intent: Option<String>,
        timestamp: String, // ISO 8601
    },
    MessageSent {
        message_id: String,
        conversation_id: String,
        source: String,
        timestamp: String, // ISO 8601
    },
}

impl SystemEvent {
    pub fn conversation_id(&self) -> &str {
        match self {
            SystemEvent::ConversationCreated { conversation_id, .. }
            | SystemEvent::ConversationStatusChanged { conversation_id, .. }
            | SystemEvent::ConversationAssigned { conversation_id, .. }
            | SystemEvent::ConversationEscalated { conversation_id, .. }
            | SystemEvent::HandoffCompleted { conversation_id, .. }
            | SystemEvent::AiModeChanged { conversation_id, .. }
            | SystemEvent::MessageReceived { conversation_id, .. }
            | SystemEvent::MessageSent { conversation_id, .. } => conversation_id,
        }
    }
}
