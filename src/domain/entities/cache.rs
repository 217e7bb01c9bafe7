use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// TTL class of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    LiveData,
    KnowledgeBase,
    UserContext,
    RoutingDecision,
}

impl CacheType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::LiveData => "live_data",
            CacheType::KnowledgeBase => "knowledge_base",
            CacheType::UserContext => "user_context",
            CacheType::RoutingDecision => "routing_decision",
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic cache key.
///
/// `digest` identifies the entry; `label` is a readable `cache_type:intent:user`
/// string that pattern invalidation matches against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub digest: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: serde_json::Value,
    pub cache_type: CacheType,
    pub inserted_at: DateTime<Utc>,
}
