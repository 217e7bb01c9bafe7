use crate::domain::entities::{ResponseDescriptor, ResponseSource};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Responses considered by the rolling error-rate alert.
const ERROR_WINDOW: usize = 100;
/// Minimum samples before the error-rate alert can fire.
const ERROR_WINDOW_MIN_SAMPLES: usize = 20;
const ERROR_RATE_ALERT: f64 = 0.2;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub live_data_responses: u64,
    pub knowledge_base_responses: u64,
    pub ai_responses: u64,
    pub error_responses: u64,
    pub escalations: u64,
    pub slow_responses: u64,
    pub cache_hit_rate: f64,
    pub average_response_time_ms: f64,
    pub recent_error_rate: f64,
}

/// Per-response timing, source mix, and alerting.
///
/// Counters also go out through the `metrics` facade so the Prometheus
/// exporter sees them; the in-process totals back the summary endpoint.
pub struct PerformanceMonitor {
    slow_threshold_ms: u64,
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    live_data: AtomicU64,
    knowledge_base: AtomicU64,
    ai: AtomicU64,
    errors: AtomicU64,
    escalations: AtomicU64,
    slow: AtomicU64,
    total_time_ms: AtomicU64,
    recent_outcomes: Mutex<VecDeque<bool>>,
}

impl PerformanceMonitor {
    pub fn new(slow_threshold_ms: u64) -> Self {
        Self {
            slow_threshold_ms,
            total_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            live_data: AtomicU64::new(0),
            knowledge_base: AtomicU64::new(0),
            ai: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            escalations: AtomicU64::new(0),
            slow: AtomicU64::new(0),
            total_time_ms: AtomicU64::new(0),
            recent_outcomes: Mutex::new(VecDeque::with_capacity(ERROR_WINDOW)),
        }
    }

    pub fn record_response(&self, descriptor: &ResponseDescriptor) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_time_ms
            .fetch_add(descriptor.timing_ms, Ordering::Relaxed);

        let counter = match descriptor.source {
            ResponseSource::Cache => &self.cache_hits,
            ResponseSource::LiveData => &self.live_data,
            ResponseSource::KnowledgeBase => &self.knowledge_base,
            ResponseSource::Ai => &self.ai,
            ResponseSource::Error => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        metrics::counter!(
            "routing_requests_total",
            "source" => descriptor.source.as_str(),
            "intent" => descriptor.intent.clone()
        )
        .increment(1);
        metrics::histogram!("routing_response_time_ms").record(descriptor.timing_ms as f64);

        if descriptor.timing_ms > self.slow_threshold_ms {
            self.slow.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("routing_slow_responses_total").increment(1);
            tracing::warn!(
                intent = %descriptor.intent,
                source = descriptor.source.as_str(),
                "Slow response: {}ms exceeds {}ms",
                descriptor.timing_ms,
                self.slow_threshold_ms
            );
        }

        self.record_outcome(descriptor.source == ResponseSource::Error);
    }

    pub fn record_escalation(&self, reason: &str) {
        self.escalations.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("conversation_escalations_total", "reason" => reason.to_string())
            .increment(1);
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let ratio = |n: u64| if total == 0 { 0.0 } else { n as f64 / total as f64 };

        PerformanceSnapshot {
            total_requests: total,
            cache_hits,
            live_data_responses: self.live_data.load(Ordering::Relaxed),
            knowledge_base_responses: self.knowledge_base.load(Ordering::Relaxed),
            ai_responses: self.ai.load(Ordering::Relaxed),
            error_responses: self.errors.load(Ordering::Relaxed),
            escalations: self.escalations.load(Ordering::Relaxed),
            slow_responses: self.slow.load(Ordering::Relaxed),
            cache_hit_rate: ratio(cache_hits),
            average_response_time_ms: ratio(self.total_time_ms.load(Ordering::Relaxed)),
            recent_error_rate: self.recent_error_rate(),
        }
    }

    fn record_outcome(&self, is_error: bool) {
        let mut window = self
            .recent_outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if window.len() == ERROR_WINDOW {
            window.pop_front();
        }
        window.push_back(is_error);

        if is_error && window.len() >= ERROR_WINDOW_MIN_SAMPLES {
            let rate = error_rate(&window);
            if rate > ERROR_RATE_ALERT {
                tracing::error!(
                    "Error rate {:.0}% over the last {} responses exceeds {:.0}%",
                    rate * 100.0,
                    window.len(),
                    ERROR_RATE_ALERT * 100.0
                );
            }
        }
    }

    fn recent_error_rate(&self) -> f64 {
        let window = self
            .recent_outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        error_rate(&window)
    }
}

fn error_rate(window: &VecDeque<bool>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().filter(|e| **e).count() as f64 / window.len() as f64
}
