use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a support conversation.
///
/// Declaration order is the forward order of the lifecycle; transitions only move
/// forward, except the implicit reopen `Closed -> New`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    New,
    AiResponded,
    AgentAssigned,
    Escalated,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::New => "new",
            ConversationStatus::AiResponded => "ai_responded",
            ConversationStatus::AgentAssigned => "agent_assigned",
            ConversationStatus::Escalated => "escalated",
            ConversationStatus::Closed => "closed",
        }
    }

    /// Unresolved conversations are the ones the inactivity sweep may escalate.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            ConversationStatus::New
                | ConversationStatus::AiResponded
                | ConversationStatus::AgentAssigned
        )
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ConversationStatus::New),
            "ai_responded" => Ok(ConversationStatus::AiResponded),
            "agent_assigned" => Ok(ConversationStatus::AgentAssigned),
            "escalated" => Ok(ConversationStatus::Escalated),
            "closed" => Ok(ConversationStatus::Closed),
            other => Err(format!("unknown conversation status '{}'", other)),
        }
    }
}

/// Per-conversation control over automated replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiMode {
    /// AI answers only while no human agent is assigned.
    #[serde(alias = "auto", alias = "AUTO")]
    Auto,
    /// AI answers regardless of assignment.
    #[serde(alias = "on", alias = "ON")]
    On,
    /// AI never answers.
    #[serde(alias = "off", alias = "OFF")]
    Off,
}

impl AiMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiMode::Auto => "Auto",
            AiMode::On => "On",
            AiMode::Off => "Off",
        }
    }
}

impl fmt::Display for AiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AiMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(AiMode::Auto),
            "on" => Ok(AiMode::On),
            "off" => Ok(AiMode::Off),
            other => Err(format!("unknown ai mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Priority {
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "urgent")]
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }

    /// One level up, saturating at `Urgent`.
    pub fn bumped(self) -> Self {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High | Priority::Urgent => Priority::Urgent,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub channel: String,
    pub customer_id: Option<String>,
    pub customer_role: Option<String>,
    pub status: ConversationStatus,
    pub assigned_agent: Option<String>,
    pub ai_mode: AiMode,
    pub priority: Priority,
    pub department: Option<String>,
    pub escalation_reason: Option<String>,
    pub escalated_at: Option<DateTime<Utc>>,
    /// Escalated but not yet handed to a human (no ticket or no agent yet).
    pub handoff_pending: bool,
    pub ticket_id: Option<String>,
    pub is_after_hours: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Conversation {
    pub fn new(
        id: String,
        channel: String,
        customer_id: Option<String>,
        customer_role: Option<String>,
        is_after_hours: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            channel,
            customer_id,
            customer_role,
            status: ConversationStatus::New,
            assigned_agent: None,
            ai_mode: AiMode::Auto,
            priority: Priority::Low,
            department: None,
            escalation_reason: None,
            escalated_at: None,
            handoff_pending: false,
            ticket_id: None,
            is_after_hours,
            created_at: now,
            last_activity_at: now,
            closed_at: None,
            version: 0,
        }
    }

    /// Whether automated replies may be generated right now.
    pub fn ai_active(&self) -> bool {
        match self.ai_mode {
            AiMode::On => true,
            AiMode::Off => false,
            AiMode::Auto => self.assigned_agent.is_none(),
        }
    }
}

/// Filters for listing conversations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationFilter {
    pub status: Option<ConversationStatus>,
    pub channel: Option<String>,
    pub assigned_agent: Option<String>,
    pub ai_mode: Option<AiMode>,
    pub priority: Option<Priority>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRequest {
    pub agent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EscalateRequest {
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    /// Defaults to `manual` when omitted.
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAiModeRequest {
    pub mode: AiMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<Conversation>,
    pub total_count: i64,
}
