use crate::domain::errors::UpstreamError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSignal {
    /// -1.0 (very negative) to 1.0 (very positive).
    pub sentiment: f64,
    pub escalate_hint: bool,
    /// Short label for the hint, e.g. `negative_sentiment` or `urgent`.
    pub reason: Option<String>,
}

impl SentimentSignal {
    pub fn neutral() -> Self {
        Self {
            sentiment: 0.0,
            escalate_hint: false,
            reason: None,
        }
    }
}

#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<SentimentSignal, UpstreamError>;
}
