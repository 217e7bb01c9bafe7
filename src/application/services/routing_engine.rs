//! Turns one inbound message into one response descriptor.
//!
//! Classification picks the path: live-data intents go through the auth gate
//! and the cache before the operational data source; knowledge intents go to
//! the knowledge cache and then the responder; anything unclassified gets an
//! open-ended AI answer. Upstream failures never escape: they degrade into an
//! error-sourced reply that asks for escalation.

use crate::application::services::auth_gate::{extract_identifier, AuthGate};
use crate::application::services::cache_service::CacheService;
use crate::application::services::data_template_provider::{DataTemplateProvider, LiveDataAnswer};
use crate::application::services::performance_monitor::PerformanceMonitor;
use crate::application::services::upstream::{call_with_retry, CallBudget};
use crate::config::RoutingConfig;
use crate::domain::entities::{
    CacheType, Classification, IntentCategory, PendingChallenge, ResponseDescriptor,
    ResponseSource, UserContext,
};
use crate::domain::errors::RoutingError;
use crate::domain::ports::knowledge_responder::{KnowledgeRequest, KnowledgeResponder};
use crate::domain::services::escalation_policy::reasons;
use crate::domain::services::intent_classifier::IntentClassifier;
use futures::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

pub const SPEAK_TO_AGENT_INTENT: &str = "speak_to_agent";

const AUTH_PROMPT: &str = "To look that up I need to verify your identity. \
     Please reply with your member ID (for example AB123456) or the email address on your account.";
const AUTH_RETRY_PROMPT: &str = "I couldn't verify that identifier. Please check it and try again, \
     or ask to talk to an agent.";
pub const DEGRADED_REPLY: &str = "I'm having trouble answering that right now. Please try again in a \
     moment, or I can connect you with our support team.";
pub const ERROR_QUICK_REPLIES: [&str; 2] = ["Try again", "Contact support"];
const FALLBACK_QUICK_REPLIES: [&str; 3] = ["Check claim status", "Policy details", "Talk to an agent"];

#[derive(Debug, Clone)]
pub struct RoutingRequest {
    pub conversation_id: String,
    pub text: String,
    pub user_context: UserContext,
    /// Intent of the previous inbound message, if any.
    pub prior_intent: Option<String>,
    /// Consecutive fallback classifications right before this message.
    pub prior_fallbacks: usize,
}

impl RoutingRequest {
    pub fn new(conversation_id: &str, text: &str, user_context: UserContext) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            user_context,
            prior_intent: None,
            prior_fallbacks: 0,
        }
    }
}

pub struct RoutingEngine {
    classifier: Arc<IntentClassifier>,
    cache: Arc<CacheService>,
    data: Arc<DataTemplateProvider>,
    auth: Arc<AuthGate>,
    responder: Arc<dyn KnowledgeResponder>,
    monitor: Arc<PerformanceMonitor>,
    config: RoutingConfig,
}

impl RoutingEngine {
    pub fn new(
        classifier: Arc<IntentClassifier>,
        cache: Arc<CacheService>,
        data: Arc<DataTemplateProvider>,
        auth: Arc<AuthGate>,
        responder: Arc<dyn KnowledgeResponder>,
        monitor: Arc<PerformanceMonitor>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            classifier,
            cache,
            data,
            auth,
            responder,
            monitor,
            config,
        }
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Classify with the routing-decision cache in front of the classifier.
    pub fn classify(&self, text: &str, prior_intent: Option<&str>) -> Classification {
        let key = CacheService::key(
            CacheType::RoutingDecision,
            "classification",
            None,
            prior_intent,
            text,
        );
        if let Some(cached) = self
            .cache
            .get(&key, CacheType::RoutingDecision)
            .and_then(|payload| serde_json::from_value::<Classification>(payload).ok())
        {
            return cached;
        }

        let classification = self.classifier.classify(text, prior_intent);
        if let Ok(payload) = serde_json::to_value(&classification) {
            self.cache.set(&key, payload, CacheType::RoutingDecision);
        }
        classification
    }

    /// Classify one inbound message of a conversation. A reply to a pending
    /// credential prompt takes the intent of the request that raised it.
    pub fn classify_message(
        &self,
        conversation_id: &str,
        text: &str,
        user_context: &UserContext,
        prior_intent: Option<&str>,
    ) -> Classification {
        if let Some((challenge, _)) = self.answered_challenge(conversation_id, text, user_context) {
            return Classification {
                confidence: self.classifier.classify(&challenge.message, None).confidence,
                intent: challenge.intent,
                category: Some(IntentCategory::LiveData),
                escalate_candidate: false,
            };
        }
        self.classify(text, prior_intent)
    }

    /// Classify and respond.
    ///
    /// Only `RoutingError::Validation` is returned; every other failure is
    /// folded into an error-sourced descriptor.
    pub async fn process(&self, request: &RoutingRequest) -> Result<ResponseDescriptor, RoutingError> {
        let text = validated_text(&request.text)?;
        let classification = self.classify_message(
            &request.conversation_id,
            text,
            &request.user_context,
            request.prior_intent.as_deref(),
        );
        self.respond(request, &classification).await
    }

    /// Respond to a message that was already classified.
    #[tracing::instrument(skip(self, request, classification), fields(conversation_id = %request.conversation_id, intent = %classification.intent))]
    pub async fn respond(
        &self,
        request: &RoutingRequest,
        classification: &Classification,
    ) -> Result<ResponseDescriptor, RoutingError> {
        let text = validated_text(&request.text)?;
        let started = Instant::now();

        let outcome = AssertUnwindSafe(self.route(request, text, classification))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(RoutingError::InternalFault("routing task panicked".to_string())));

        let mut descriptor = match outcome {
            Ok(descriptor) => descriptor,
            Err(RoutingError::Validation(msg)) => return Err(RoutingError::Validation(msg)),
            Err(err) => self.degraded(classification, &err),
        };
        descriptor.timing_ms = started.elapsed().as_millis() as u64;
        self.monitor.record_response(&descriptor);

        tracing::debug!(
            "Routed via {} in {}ms (escalate={})",
            descriptor.source.as_str(),
            descriptor.timing_ms,
            descriptor.escalate
        );
        Ok(descriptor)
    }

    async fn route(
        &self,
        request: &RoutingRequest,
        text: &str,
        classification: &Classification,
    ) -> Result<ResponseDescriptor, RoutingError> {
        let conversation_id = &request.conversation_id;

        // A reply to a credential prompt completes the pending live-data request
        if let Some((challenge, identifier)) =
            self.answered_challenge(conversation_id, text, &request.user_context)
        {
            return self.complete_verification(request, &identifier, challenge).await;
        }

        let mut descriptor = match classification.category {
            Some(IntentCategory::LiveData) => self.live_data(request, text, classification).await?,
            Some(IntentCategory::KnowledgeBase) => self.knowledge(request, text, classification).await?,
            None => self.fallback(request, text, classification).await?,
        };

        descriptor.escalate_candidate = classification.escalate_candidate;
        if descriptor.quick_replies.is_empty() {
            descriptor.quick_replies = self.intent_quick_replies(&classification.intent);
        }
        Ok(descriptor)
    }

    /// Pending challenge and the identifier `text` offers for it, when the
    /// caller is not yet verified.
    fn answered_challenge(
        &self,
        conversation_id: &str,
        text: &str,
        user_context: &UserContext,
    ) -> Option<(PendingChallenge, String)> {
        let challenge = self.auth.pending_challenge(conversation_id)?;
        let identifier = extract_identifier(text)?;
        if self.auth.is_authenticated(conversation_id, user_context) {
            return None;
        }
        Some((challenge, identifier))
    }

    async fn live_data(
        &self,
        request: &RoutingRequest,
        text: &str,
        classification: &Classification,
    ) -> Result<ResponseDescriptor, RoutingError> {
        let state = self.auth.state(&request.conversation_id, &request.user_context);
        let subject = match state.subject {
            Some(subject) if state.verified => subject,
            _ => {
                tracing::info!(
                    "Live-data intent {} needs verification for conversation {}",
                    classification.intent,
                    request.conversation_id
                );
                self.auth.record_challenge(
                    &request.conversation_id,
                    PendingChallenge {
                        intent: classification.intent.clone(),
                        message: text.to_string(),
                    },
                );
                return Ok(ResponseDescriptor::new(
                    AUTH_PROMPT,
                    &classification.intent,
                    ResponseSource::KnowledgeBase,
                    classification.confidence,
                )
                .with_action("auth_required", json!(true)));
            }
        };

        self.live_answer(
            &classification.intent,
            classification.confidence,
            &subject,
            request.user_context.role.as_deref(),
            text,
        )
        .await
    }

    async fn live_answer(
        &self,
        intent: &str,
        confidence: f64,
        subject: &str,
        role: Option<&str>,
        text: &str,
    ) -> Result<ResponseDescriptor, RoutingError> {
        let key = CacheService::key(CacheType::LiveData, intent, Some(subject), role, text);
        if let Some(answer) = self
            .cache
            .get(&key, CacheType::LiveData)
            .and_then(|payload| serde_json::from_value::<LiveDataAnswer>(payload).ok())
        {
            return Ok(ResponseDescriptor::new(answer.text, intent, ResponseSource::Cache, confidence));
        }

        let answer = self.data.answer(intent, subject).await?;
        if answer.record_found {
            if let Ok(payload) = serde_json::to_value(&answer) {
                self.cache.set(&key, payload, CacheType::LiveData);
            }
        }
        Ok(ResponseDescriptor::new(answer.text, intent, ResponseSource::LiveData, confidence))
    }

    async fn complete_verification(
        &self,
        request: &RoutingRequest,
        identifier: &str,
        challenge: PendingChallenge,
    ) -> Result<ResponseDescriptor, RoutingError> {
        let state = self.auth.verify(identifier, &request.conversation_id).await?;
        let confidence = self.classifier.classify(&challenge.message, None).confidence;

        let subject = match state.subject {
            Some(subject) if state.verified => subject,
            _ => {
                return Ok(ResponseDescriptor::new(
                    AUTH_RETRY_PROMPT,
                    &challenge.intent,
                    ResponseSource::KnowledgeBase,
                    confidence,
                )
                .with_action("auth_required", json!(true))
                .with_quick_replies(vec!["Talk to an agent".to_string()]));
            }
        };

        self.auth.clear_challenge(&request.conversation_id);
        let mut descriptor = self
            .live_answer(
                &challenge.intent,
                confidence,
                &subject,
                request.user_context.role.as_deref(),
                &challenge.message,
            )
            .await?;
        descriptor.text = format!("Thanks, you're verified. {}", descriptor.text);
        descriptor.quick_replies = self.intent_quick_replies(&challenge.intent);
        Ok(descriptor.with_action("verified", json!(true)))
    }

    async fn knowledge(
        &self,
        request: &RoutingRequest,
        text: &str,
        classification: &Classification,
    ) -> Result<ResponseDescriptor, RoutingError> {
        let intent = classification.intent.as_str();
        let key = CacheService::key(CacheType::KnowledgeBase, intent, None, None, text);

        let descriptor = match self.cache.get(&key, CacheType::KnowledgeBase) {
            Some(serde_json::Value::String(answer)) => {
                ResponseDescriptor::new(answer, intent, ResponseSource::Cache, classification.confidence)
            }
            _ => {
                let answer = self.ask_responder(request, text, classification).await?;
                self.cache.set(
                    &key,
                    serde_json::Value::String(answer.clone()),
                    CacheType::KnowledgeBase,
                );
                ResponseDescriptor::new(
                    answer,
                    intent,
                    ResponseSource::KnowledgeBase,
                    classification.confidence,
                )
            }
        };

        if intent == SPEAK_TO_AGENT_INTENT {
            return Ok(descriptor.escalating(reasons::CUSTOMER_REQUEST));
        }
        Ok(descriptor)
    }

    async fn fallback(
        &self,
        request: &RoutingRequest,
        text: &str,
        classification: &Classification,
    ) -> Result<ResponseDescriptor, RoutingError> {
        let answer = self.ask_responder(request, text, classification).await?;
        let descriptor = ResponseDescriptor::new(
            answer,
            &classification.intent,
            ResponseSource::Ai,
            classification.confidence,
        )
        .with_quick_replies(FALLBACK_QUICK_REPLIES.iter().map(|r| r.to_string()).collect());

        let threshold = self.config.fallback_escalation_threshold;
        if threshold > 0 && request.prior_fallbacks + 1 >= threshold {
            tracing::info!(
                "Conversation {} hit {} consecutive unclassified messages",
                request.conversation_id,
                request.prior_fallbacks + 1
            );
            return Ok(descriptor.escalating(reasons::REPEATED_FALLBACK));
        }
        Ok(descriptor)
    }

    async fn ask_responder(
        &self,
        request: &RoutingRequest,
        text: &str,
        classification: &Classification,
    ) -> Result<String, RoutingError> {
        let knowledge_request = KnowledgeRequest {
            conversation_id: request.conversation_id.clone(),
            intent: classification.intent.clone(),
            category: classification.category,
            message: text.to_string(),
        };
        let budget = CallBudget::new(
            "ai_responder",
            self.config.ai_timeout,
            self.config.retry_deadline_factor,
        );
        let responder = &self.responder;
        let req = &knowledge_request;
        Ok(call_with_retry(budget, move || responder.respond(req)).await?)
    }

    fn degraded(&self, classification: &Classification, err: &RoutingError) -> ResponseDescriptor {
        let kind = match err {
            RoutingError::UpstreamTimeout(_) => "upstream_timeout",
            RoutingError::Upstream(_) => "upstream_error",
            RoutingError::InternalFault(_) => "internal_fault",
            RoutingError::Validation(_) => "validation",
        };
        tracing::error!("Routing failed for intent {}: {}", classification.intent, err);

        let mut descriptor = ResponseDescriptor::new(
            DEGRADED_REPLY,
            &classification.intent,
            ResponseSource::Error,
            classification.confidence,
        )
        .with_quick_replies(ERROR_QUICK_REPLIES.iter().map(|r| r.to_string()).collect())
        .with_action("error", json!(kind))
        .escalating(reasons::AUTOMATION_FAILURE);
        descriptor.escalate_candidate = classification.escalate_candidate;
        descriptor
    }

    fn intent_quick_replies(&self, intent: &str) -> Vec<String> {
        self.classifier
            .definition(intent)
            .map(|d| d.quick_replies.clone())
            .unwrap_or_default()
    }
}

fn validated_text(text: &str) -> Result<&str, RoutingError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RoutingError::Validation("Message text must not be empty".to_string()));
    }
    Ok(trimmed)
}
