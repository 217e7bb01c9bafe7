//! Rule-based intent classification.
//!
//! Every intent in the catalog is scored independently from weighted regex
//! signals. The best score wins; ties keep the earlier catalog entry. A winner
//! below its own threshold collapses to the fallback intent with confidence 0.

use crate::domain::entities::{Classification, IntentCategory, IntentDefinition};
use regex::Regex;
use tracing::{debug, warn};

/// Bonus for the intent the conversation was already discussing, so short
/// follow-ups ("and its status?") stay on topic.
const DEFAULT_CONTEXT_BONUS: f64 = 0.2;

struct CompiledIntent {
    definition: IntentDefinition,
    signals: Vec<(Regex, f64)>,
}

pub struct IntentClassifier {
    catalog: Vec<CompiledIntent>,
    context_bonus: f64,
}

impl IntentClassifier {
    /// Compile a catalog. Patterns that fail to compile are logged and skipped.
    pub fn new(definitions: Vec<IntentDefinition>) -> Self {
        let catalog = definitions
            .into_iter()
            .map(|definition| {
                let signals = definition
                    .signals
                    .iter()
                    .filter_map(|signal| {
                        match Regex::new(&format!("(?i){}", signal.pattern)) {
                            Ok(regex) => Some((regex, signal.weight)),
                            Err(e) => {
                                warn!(
                                    "Skipping invalid pattern {:?} for intent {}: {}",
                                    signal.pattern, definition.name, e
                                );
                                None
                            }
                        }
                    })
                    .collect();
                CompiledIntent {
                    definition,
                    signals,
                }
            })
            .collect();

        Self {
            catalog,
            context_bonus: DEFAULT_CONTEXT_BONUS,
        }
    }

    pub fn with_default_catalog() -> Self {
        Self::new(default_catalog())
    }

    pub fn with_context_bonus(mut self, bonus: f64) -> Self {
        self.context_bonus = bonus;
        self
    }

    pub fn definition(&self, intent: &str) -> Option<&IntentDefinition> {
        self.catalog
            .iter()
            .map(|c| &c.definition)
            .find(|d| d.name == intent)
    }

    pub fn category_of(&self, intent: &str) -> Option<IntentCategory> {
        self.definition(intent).map(|d| d.category)
    }

    /// Classify trimmed message text. Never fails: a scoring fault yields fallback.
    pub fn classify(&self, text: &str, prior_intent: Option<&str>) -> Classification {
        let text = text.trim();
        if text.is_empty() {
            return Classification::fallback();
        }

        let mut best: Option<(&CompiledIntent, f64)> = None;
        for intent in &self.catalog {
            let score = self.score(intent, text, prior_intent);
            if !score.is_finite() {
                warn!(
                    "Non-finite score for intent {}; classifying as fallback",
                    intent.definition.name
                );
                return Classification::fallback();
            }
            // Strictly greater keeps the earlier catalog entry on ties
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((intent, score));
            }
        }

        match best {
            Some((intent, score)) if score > 0.0 && score >= intent.definition.threshold => {
                debug!(
                    "Classified message as {} (confidence {:.2})",
                    intent.definition.name, score
                );
                Classification {
                    intent: intent.definition.name.clone(),
                    category: Some(intent.definition.category),
                    confidence: score,
                    escalate_candidate: false,
                }
            }
            _ => Classification::fallback(),
        }
    }

    fn score(&self, intent: &CompiledIntent, text: &str, prior_intent: Option<&str>) -> f64 {
        let mut score: f64 = intent
            .signals
            .iter()
            .filter(|(regex, _)| regex.is_match(text))
            .map(|(_, weight)| weight)
            .sum();
        if !score.is_finite() {
            return score;
        }

        if score > 0.0 && prior_intent == Some(intent.definition.name.as_str()) {
            score += self.context_bonus;
        }

        score.min(1.0)
    }
}

/// Built-in catalog for an insurance support desk. Order is the tie-break order.
pub fn default_catalog() -> Vec<IntentDefinition> {
    use IntentCategory::*;

    vec![
        IntentDefinition::new("claim_status", LiveData, 0.6)
            .signal(r"\bclaims?\b", 0.45)
            .signal(r"\bstatus\b", 0.3)
            .signal(r"\bclaim (status|number|progress)\b", 0.4)
            .signal(r"\b(track|tracking|progress|update on)\b", 0.2)
            .quick_replies(&["Upload documents", "Talk to an agent"]),
        IntentDefinition::new("policy_details", LiveData, 0.6)
            .signal(r"\bpolic(y|ies)\b", 0.45)
            .signal(r"\b(details|coverage|covered|deductible|premium|renewal)\b", 0.3)
            .signal(r"\bmy polic(y|ies)\b", 0.2)
            .quick_replies(&["Check claim status", "Billing balance"]),
        IntentDefinition::new("billing_balance", LiveData, 0.5)
            .signal(r"\b(balance|owe|amount due|outstanding)\b", 0.5)
            .signal(r"\b(bill|billing|invoice)\b", 0.3)
            .quick_replies(&["Payment status", "Talk to an agent"]),
        IntentDefinition::new("payment_status", LiveData, 0.6)
            .signal(r"\bpayments?\b", 0.45)
            .signal(r"\b(received|went through|processed|status|last)\b", 0.25)
            .signal(r"\b(did|has) my payment\b", 0.3)
            .quick_replies(&["Billing balance"]),
        IntentDefinition::new("greeting", KnowledgeBase, 0.5)
            .signal(r"^\s*(hi|hello|hey|good (morning|afternoon|evening))\b", 0.8)
            .quick_replies(&["Check claim status", "Policy details", "Talk to an agent"]),
        IntentDefinition::new("business_hours", KnowledgeBase, 0.6)
            .signal(r"\b(hours|open|opening|close|closing)\b", 0.45)
            .signal(r"\b(when|what time)\b", 0.25),
        IntentDefinition::new("contact_info", KnowledgeBase, 0.5)
            .signal(r"\b(phone|call|email|address|contact)\b", 0.5)
            .signal(r"\b(number|reach)\b", 0.2),
        IntentDefinition::new("file_claim", KnowledgeBase, 0.6)
            .signal(r"\b(file|submit|start|open|make) (a |an )?(new )?claim\b", 0.8)
            .signal(r"\bhow (do|can) i\b", 0.2)
            .quick_replies(&["Upload documents", "Check claim status"]),
        IntentDefinition::new("reset_password", KnowledgeBase, 0.6)
            .signal(r"\b(password|log ?in|sign ?in|locked out)\b", 0.5)
            .signal(r"\b(reset|forgot|change|can'?t)\b", 0.3),
        IntentDefinition::new("speak_to_agent", KnowledgeBase, 0.6)
            .signal(r"\b(human|agent|representative|real person|someone)\b", 0.5)
            .signal(r"\b(speak|talk|connect|transfer)\b", 0.35),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::FALLBACK_INTENT;

    fn classifier() -> IntentClassifier {
        IntentClassifier::with_default_catalog()
    }

    #[test]
    fn test_claim_status_question() {
        let c = classifier().classify("What is my claim status?", None);
        assert_eq!(c.intent, "claim_status");
        assert_eq!(c.category, Some(IntentCategory::LiveData));
        assert!(c.confidence >= 0.6);
        assert!(!c.escalate_candidate);
    }

    #[test]
    fn test_gibberish_is_fallback_with_zero_confidence() {
        let c = classifier().classify("asdkjqwe", None);
        assert_eq!(c.intent, FALLBACK_INTENT);
        assert_eq!(c.confidence, 0.0);
        assert!(c.escalate_candidate);
        assert!(c.category.is_none());
    }

    #[test]
    fn test_below_threshold_is_deterministic_fallback() {
        // "claim" alone scores 0.45 against a 0.6 threshold
        let first = classifier().classify("claim", None);
        let second = classifier().classify("claim", None);
        assert!(first.is_fallback());
        assert_eq!(first, second);
    }

    #[test]
    fn test_prior_intent_lifts_follow_up_over_threshold() {
        let without = classifier().classify("claim please", None);
        assert!(without.is_fallback());

        let with = classifier().classify("claim please", Some("claim_status"));
        assert_eq!(with.intent, "claim_status");
    }

    #[test]
    fn test_file_claim_beats_claim_status() {
        let c = classifier().classify("How do I file a claim?", None);
        assert_eq!(c.intent, "file_claim");
        assert_eq!(c.category, Some(IntentCategory::KnowledgeBase));
    }

    #[test]
    fn test_ties_resolve_to_catalog_order() {
        let catalog = vec![
            IntentDefinition::new("first", IntentCategory::KnowledgeBase, 0.5)
                .signal(r"\bshared\b", 0.7),
            IntentDefinition::new("second", IntentCategory::KnowledgeBase, 0.5)
                .signal(r"\bshared\b", 0.7),
        ];
        let c = IntentClassifier::new(catalog).classify("shared word", None);
        assert_eq!(c.intent, "first");
    }

    #[test]
    fn test_invalid_pattern_is_skipped_not_fatal() {
        let catalog = vec![IntentDefinition::new("broken", IntentCategory::KnowledgeBase, 0.5)
            .signal(r"(unclosed", 0.9)
            .signal(r"\bworks\b", 0.6)];
        let classifier = IntentClassifier::new(catalog);
        assert_eq!(classifier.classify("this works", None).intent, "broken");
        assert!(classifier.classify("(unclosed", None).is_fallback());
    }

    #[test]
    fn test_non_finite_weight_yields_fallback() {
        let catalog = vec![IntentDefinition::new("odd", IntentCategory::KnowledgeBase, 0.5)
            .signal(r"\bx\b", f64::NAN)];
        let c = IntentClassifier::new(catalog).classify("x", None);
        assert!(c.is_fallback());
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn test_confidence_capped_at_one() {
        let c = classifier().classify("claim status claim number tracking progress", None);
        assert!(c.confidence <= 1.0);
    }

    #[test]
    fn test_speak_to_agent() {
        let c = classifier().classify("Can I talk to a real person", None);
        assert_eq!(c.intent, "speak_to_agent");
    }
}
