use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the intent returned when nothing scores above its threshold.
pub const FALLBACK_INTENT: &str = "fallback";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// Needs an authoritative lookup against operational data; requires a verified identity.
    LiveData,
    /// Answerable from static or generated knowledge content.
    KnowledgeBase,
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentCategory::LiveData => write!(f, "live_data"),
            IntentCategory::KnowledgeBase => write!(f, "knowledge_base"),
        }
    }
}

/// A weighted regex signal contributing to an intent's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSignal {
    pub pattern: String,
    pub weight: f64,
}

impl IntentSignal {
    pub fn new(pattern: &str, weight: f64) -> Self {
        Self {
            pattern: pattern.to_string(),
            weight,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentDefinition {
    pub name: String,
    pub category: IntentCategory,
    pub threshold: f64,
    pub signals: Vec<IntentSignal>,
    #[serde(default)]
    pub quick_replies: Vec<String>,
}

impl IntentDefinition {
    pub fn new(name: &str, category: IntentCategory, threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            category,
            threshold,
            signals: Vec::new(),
            quick_replies: Vec::new(),
        }
    }

    pub fn signal(mut self, pattern: &str, weight: f64) -> Self {
        self.signals.push(IntentSignal::new(pattern, weight));
        self
    }

    pub fn quick_replies(mut self, replies: &[&str]) -> Self {
        self.quick_replies = replies.iter().map(|r| r.to_string()).collect();
        self
    }
}

/// Output of the intent classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: String,
    /// `None` for the fallback intent.
    pub category: Option<IntentCategory>,
    pub confidence: f64,
    /// Set when nothing cleared its threshold; the caller may escalate.
    pub escalate_candidate: bool,
}

impl Classification {
    pub fn fallback() -> Self {
        Self {
            intent: FALLBACK_INTENT.to_string(),
            category: None,
            confidence: 0.0,
            escalate_candidate: true,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.intent == FALLBACK_INTENT
    }

    pub fn is_live_data(&self) -> bool {
        self.category == Some(IntentCategory::LiveData)
    }
}
