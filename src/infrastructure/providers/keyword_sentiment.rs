use crate::domain::errors::UpstreamError;
use crate::domain::ports::sentiment_analyzer::{SentimentAnalyzer, SentimentSignal};
use crate::domain::services::escalation_policy::reasons;
use async_trait::async_trait;
use regex::Regex;

const NEGATIVE_WORDS: &[&str] = &[
    "angry", "annoyed", "awful", "frustrated", "furious", "horrible", "ridiculous", "terrible",
    "unacceptable", "upset", "useless", "worst", "scam", "disappointed", "complaint",
];
const POSITIVE_WORDS: &[&str] = &["thanks", "thank", "great", "helpful", "perfect", "appreciate"];
const URGENT_PATTERN: &str = r"(?i)\b(urgent|emergency|immediately|asap|right now|lawyer|legal action)\b";

/// Lexicon-based sentiment: counts negative and positive words and flags
/// urgency phrases.
pub struct KeywordSentimentAnalyzer {
    urgent: Option<Regex>,
    /// Sentiment at or below this, with at least two negative words, hints escalation.
    negative_threshold: f64,
}

impl KeywordSentimentAnalyzer {
    pub fn new() -> Self {
        let urgent = match Regex::new(URGENT_PATTERN) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!("Urgency pattern failed to compile: {}", e);
                None
            }
        };
        Self {
            urgent,
            negative_threshold: -0.5,
        }
    }

    pub fn score(&self, text: &str) -> SentimentSignal {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let negative = words.iter().filter(|w| NEGATIVE_WORDS.contains(*w)).count();
        let positive = words.iter().filter(|w| POSITIVE_WORDS.contains(*w)).count();
        let sentiment = if negative + positive == 0 {
            0.0
        } else {
            (positive as f64 - negative as f64) / (positive + negative) as f64
        };

        if self.urgent.as_ref().map(|r| r.is_match(text)).unwrap_or(false) {
            return SentimentSignal {
                sentiment,
                escalate_hint: true,
                reason: Some(reasons::URGENT.to_string()),
            };
        }
        if negative >= 2 && sentiment <= self.negative_threshold {
            return SentimentSignal {
                sentiment,
                escalate_hint: true,
                reason: Some(reasons::NEGATIVE_SENTIMENT.to_string()),
            };
        }

        SentimentSignal {
            sentiment,
            escalate_hint: false,
            reason: None,
        }
    }
}

impl Default for KeywordSentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentAnalyzer for KeywordSentimentAnalyzer {
    async fn analyze(&self, text: &str) -> Result<SentimentSignal, UpstreamError> {
        Ok(self.score(text))
    }
}
