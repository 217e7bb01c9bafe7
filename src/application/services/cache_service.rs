//! TTL cache for reusable computed responses.
//!
//! Expiry is lazy: a read past an entry's TTL deletes it and reports a miss.
//! Entries are independently keyed and writes are last-write-wins, so no
//! cross-entry locking is needed.

use crate::config::{CacheTtlConfig, MAX_CACHE_TTL_SECS};
use crate::domain::entities::{CacheEntry, CacheKey, CacheType};
use crate::domain::ports::time_service::TimeService;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::Arc;

const ANONYMOUS: &str = "anonymous";

pub struct CacheService {
    entries: DashMap<String, CacheEntry>,
    ttl: CacheTtlConfig,
    clock: Arc<dyn TimeService>,
}

impl CacheService {
    pub fn new(ttl: CacheTtlConfig, clock: Arc<dyn TimeService>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl_for(&self, cache_type: CacheType) -> chrono::Duration {
        let secs = match cache_type {
            CacheType::LiveData => self.ttl.live_data_secs,
            CacheType::KnowledgeBase => self.ttl.knowledge_base_secs,
            CacheType::UserContext => self.ttl.user_context_secs,
            CacheType::RoutingDecision => self.ttl.routing_decision_secs,
        };
        chrono::Duration::seconds(secs.min(MAX_CACHE_TTL_SECS) as i64)
    }

    /// Deterministic key over intent, identity, role and message fingerprint.
    pub fn key(
        cache_type: CacheType,
        intent: &str,
        user_id: Option<&str>,
        role: Option<&str>,
        message: &str,
    ) -> CacheKey {
        let user = user_id.unwrap_or(ANONYMOUS);
        let mut hasher = Sha256::new();
        for part in [
            cache_type.as_str(),
            intent,
            user,
            role.unwrap_or(""),
            &fingerprint(message),
        ] {
            hasher.update(part.as_bytes());
            // Separator so ("ab", "c") and ("a", "bc") hash differently
            hasher.update([0u8]);
        }

        CacheKey {
            digest: hex::encode(hasher.finalize()),
            label: format!("{}:{}:{}", cache_type, intent, user),
        }
    }

    pub fn get(&self, key: &CacheKey, cache_type: CacheType) -> Option<serde_json::Value> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(&key.digest) {
            if entry.cache_type == cache_type && !self.is_expired(&entry, now) {
                record_lookup(cache_type, "hit");
                return Some(entry.payload.clone());
            }
        }

        let evicted = self
            .entries
            .remove_if(&key.digest, |_, entry| self.is_expired(entry, now))
            .is_some();
        if evicted {
            tracing::debug!("Evicted expired cache entry {}", key.label);
        }
        record_lookup(cache_type, "miss");
        None
    }

    pub fn set(&self, key: &CacheKey, payload: serde_json::Value, cache_type: CacheType) {
        let entry = CacheEntry {
            key: key.clone(),
            payload,
            cache_type,
            inserted_at: self.clock.now(),
        };
        self.entries.insert(key.digest.clone(), entry);
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.entries.remove(&key.digest).is_some()
    }

    /// Remove every entry whose label matches a glob (`*` and `?`). Returns the count.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let regex = match glob_to_regex(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                tracing::warn!("Ignoring invalid cache invalidation pattern {:?}: {}", pattern, e);
                return 0;
            }
        };
        self.remove_where(|entry| regex.is_match(&entry.key.label))
    }

    /// Remove every entry cached for `user_id`. Returns the count.
    pub fn invalidate_user(&self, user_id: &str) -> usize {
        self.remove_where(|entry| {
            entry
                .key
                .label
                .rsplit_once(':')
                .map(|(_, user)| user == user_id)
                .unwrap_or(false)
        })
    }

    /// Live entry count, expired entries included until they are read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.inserted_at >= self.ttl_for(entry.cache_type)
    }

    fn remove_where(&self, predicate: impl Fn(&CacheEntry) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !predicate(entry));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::info!("Invalidated {} cache entries", removed);
        }
        removed
    }
}

fn record_lookup(cache_type: CacheType, result: &'static str) {
    metrics::counter!(
        "cache_lookups_total",
        "cache_type" => cache_type.as_str(),
        "result" => result
    )
    .increment(1);
}

/// Case, punctuation and spacing-insensitive form of a message.
pub fn fingerprint(message: &str) -> String {
    message
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}
