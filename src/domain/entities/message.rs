use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a message relative to the support desk.
///
/// Declaration order doubles as the tie-break when two messages share a timestamp:
/// inbound sorts before outbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::Inbound => "inbound",
            MessageDirection::Outbound => "outbound",
        }
    }

    /// Numeric rank persisted alongside the message for ordering.
    pub fn rank(&self) -> i64 {
        match self {
            MessageDirection::Inbound => 0,
            MessageDirection::Outbound => 1,
        }
    }
}

impl From<String> for MessageDirection {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "outbound" => MessageDirection::Outbound,
            _ => MessageDirection::Inbound,
        }
    }
}

impl std::fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub direction: MessageDirection,
    /// Customer id, agent id, or `"assistant"` for automated replies.
    pub sender: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Position within the conversation, assigned on append.
    pub sequence: i64,
    pub intent: Option<String>,
    pub confidence: Option<f64>,
}

impl Message {
    pub fn inbound(conversation_id: &str, sender: &str, content: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            direction: MessageDirection::Inbound,
            sender: sender.to_string(),
            content: content.to_string(),
            timestamp,
            sequence: 0,
            intent: None,
            confidence: None,
        }
    }

    pub fn outbound(conversation_id: &str, sender: &str, content: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            direction: MessageDirection::Outbound,
            ..Self::inbound(conversation_id, sender, content, timestamp)
        }
    }

    pub fn with_classification(mut self, intent: &str, confidence: f64) -> Self {
        self.intent = Some(intent.to_string());
        self.confidence = Some(confidence);
        self
    }
}

/// Sender id used for automated replies.
pub const ASSISTANT_SENDER: &str = "assistant";
