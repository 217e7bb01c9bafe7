use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    LiveData,
    KnowledgeBase,
    Ai,
    Error,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::LiveData => "live_data",
            ResponseSource::KnowledgeBase => "knowledge_base",
            ResponseSource::Ai => "ai",
            ResponseSource::Error => "error",
        }
    }
}

/// Identity and channel facts supplied by the channel adapter with each message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    /// The channel already authenticated this user (e.g. a logged-in portal).
    #[serde(default)]
    pub authenticated: bool,
}

impl UserContext {
    pub fn anonymous(channel: &str) -> Self {
        Self {
            channel: Some(channel.to_string()),
            ..Self::default()
        }
    }

    pub fn authenticated(user_id: &str, channel: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            role: Some("customer".to_string()),
            channel: Some(channel.to_string()),
            authenticated: true,
        }
    }
}

/// Assembled reply produced by the routing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    pub text: String,
    pub intent: String,
    pub source: ResponseSource,
    pub confidence: f64,
    pub escalate: bool,
    /// Classifier found nothing above threshold for this message.
    pub escalate_candidate: bool,
    pub quick_replies: Vec<String>,
    pub actions: BTreeMap<String, serde_json::Value>,
    pub timing_ms: u64,
    /// Reason attached when `escalate` is set.
    pub escalation_reason: Option<String>,
}

impl ResponseDescriptor {
    pub fn new(text: impl Into<String>, intent: &str, source: ResponseSource, confidence: f64) -> Self {
        Self {
            text: text.into(),
            intent: intent.to_string(),
            source,
            confidence,
            escalate: false,
            escalate_candidate: false,
            quick_replies: Vec::new(),
            actions: BTreeMap::new(),
            timing_ms: 0,
            escalation_reason: None,
        }
    }

    pub fn with_quick_replies(mut self, replies: Vec<String>) -> Self {
        self.quick_replies = replies;
        self
    }

    pub fn with_action(mut self, name: &str, value: serde_json::Value) -> Self {
        self.actions.insert(name.to_string(), value);
        self
    }

    pub fn escalating(mut self, reason: &str) -> Self {
        self.escalate = true;
        self.escalation_reason = Some(reason.to_string());
        self
    }

    pub fn cache_hit(&self) -> bool {
        self.source == ResponseSource::Cache
    }

    pub fn live_data_used(&self) -> bool {
        matches!(self.source, ResponseSource::Cache | ResponseSource::LiveData)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub intent: Option<String>,
    /// `None` when no automated reply was produced (AI suppressed).
    pub source: Option<ResponseSource>,
    pub confidence: f64,
    pub response_time_ms: u64,
    pub cache_hit: bool,
    pub live_data_used: bool,
    pub escalate_candidate: bool,
    pub timestamp: DateTime<Utc>,
}

/// JSON shape returned by the inbound `process_message` surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessMessageResponse {
    pub success: bool,
    pub conversation_id: String,
    pub response: Option<String>,
    pub metadata: ResponseMetadata,
    pub quick_replies: Vec<String>,
    pub actions: BTreeMap<String, serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessMessageRequest {
    pub text: String,
    #[serde(default)]
    pub user_context: UserContext,
}
