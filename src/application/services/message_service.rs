use crate::application::services::conversation_service::ConversationService;
use crate::application::services::routing_engine::{
    RoutingEngine, RoutingRequest, DEGRADED_REPLY, ERROR_QUICK_REPLIES,
};
use crate::application::services::upstream::{call_with_retry, CallBudget};
use crate::domain::entities::{
    format_timestamp, Classification, Conversation, ConversationStatus, Message,
    ProcessMessageRequest, ProcessMessageResponse, ResponseDescriptor, ResponseMetadata,
    ResponseSource, UserContext, ASSISTANT_SENDER, FALLBACK_INTENT,
};
use crate::domain::errors::{DomainError, DomainResult, RoutingError};
use crate::domain::events::SystemEvent;
use crate::domain::ports::message_repository::MessageRepository;
use crate::domain::ports::sentiment_analyzer::{SentimentAnalyzer, SentimentSignal};
use crate::domain::ports::time_service::TimeService;
use crate::domain::services::escalation_policy::reasons;
use crate::domain::services::state_machine::TransitionContext;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const CUSTOMER_SENDER: &str = "customer";
/// Error kind reported to callers when the pipeline itself fails.
const INTERNAL_FAULT: &str = "internal_fault";

/// Outcome of the locked intake step.
struct Intake {
    conversation: Conversation,
    classification: Classification,
    prior_intent: Option<String>,
    prior_fallbacks: usize,
}

/// Inbound message pipeline.
///
/// Intake and reply are each applied under the conversation lock; routing
/// runs between them without the lock so slow collaborators never block
/// assignment or escalation of the same conversation.
#[derive(Clone)]
pub struct MessageService {
    conversations: ConversationService,
    routing: Arc<RoutingEngine>,
    message_repo: Arc<dyn MessageRepository>,
    sentiment: Arc<dyn SentimentAnalyzer>,
    clock: Arc<dyn TimeService>,
    sentiment_budget: CallBudget,
    fallback_window: usize,
}

impl MessageService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversations: ConversationService,
        routing: Arc<RoutingEngine>,
        message_repo: Arc<dyn MessageRepository>,
        sentiment: Arc<dyn SentimentAnalyzer>,
        clock: Arc<dyn TimeService>,
        sentiment_timeout: Duration,
        retry_factor: f64,
        fallback_window: usize,
    ) -> Self {
        Self {
            conversations,
            routing,
            message_repo,
            sentiment,
            clock,
            sentiment_budget: CallBudget::new("sentiment_analyzer", sentiment_timeout, retry_factor),
            fallback_window: fallback_window.max(1),
        }
    }

    /// Store an inbound message, route it, store the reply, and apply any
    /// resulting transition or escalation. Always returns a structured
    /// response. Rejected input carries the validation message; any other
    /// failure carries the apologetic reply, the `internal_fault` kind, and
    /// flags the conversation for escalation.
    #[tracing::instrument(skip(self, request))]
    pub async fn process_message(
        &self,
        conversation_id: &str,
        request: ProcessMessageRequest,
    ) -> ProcessMessageResponse {
        let started = Instant::now();
        match self.handle(conversation_id, &request, started).await {
            Ok(response) => response,
            Err(DomainError::ValidationError(msg)) => {
                tracing::info!("Rejected message for {}: {}", conversation_id, msg);
                self.failure(conversation_id, msg, None, started)
            }
            Err(e) => {
                tracing::error!("Failed to process message for {}: {}", conversation_id, e);
                let escalated = self.escalate_after_fault(conversation_id).await;
                let mut response = self.failure(
                    conversation_id,
                    INTERNAL_FAULT.to_string(),
                    Some(ResponseSource::Error),
                    started,
                );
                response.response = Some(DEGRADED_REPLY.to_string());
                response.actions.insert("error".to_string(), json!(INTERNAL_FAULT));
                response.actions.insert("escalate".to_string(), json!(true));
                response.actions.insert("escalated".to_string(), json!(escalated));
                response
            }
        }
    }

    /// Best-effort escalation after a pipeline failure. Returns whether the
    /// conversation ended up escalated.
    async fn escalate_after_fault(&self, conversation_id: &str) -> bool {
        let _guard = self.conversations.lock(conversation_id).await;
        let conversation = match self.conversations.get_conversation(conversation_id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                tracing::warn!("Cannot flag {} for escalation: {}", conversation_id, e);
                return false;
            }
        };
        if !conversation.status.is_unresolved() {
            return conversation.status == ConversationStatus::Escalated;
        }

        match self
            .conversations
            .escalation()
            .escalate(conversation, reasons::AUTOMATION_FAILURE, None, None)
            .await
        {
            Ok(conversation) => conversation.status == ConversationStatus::Escalated,
            Err(e) => {
                tracing::warn!("Escalation after failure for {} did not stick: {}", conversation_id, e);
                false
            }
        }
    }

    async fn handle(
        &self,
        conversation_id: &str,
        request: &ProcessMessageRequest,
        started: Instant,
    ) -> DomainResult<ProcessMessageResponse> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(DomainError::ValidationError(
                "Message text must not be empty".to_string(),
            ));
        }
        if conversation_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Conversation id must not be empty".to_string(),
            ));
        }

        let intake = self
            .intake(conversation_id, text, &request.user_context)
            .await?;

        let routing_request = RoutingRequest {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            user_context: request.user_context.clone(),
            prior_intent: intake.prior_intent.clone(),
            prior_fallbacks: intake.prior_fallbacks,
        };
        let ai_active = intake.conversation.ai_active();
        let (routed, sentiment) = tokio::join!(
            self.route(ai_active, &routing_request, &intake.classification),
            self.analyze_sentiment(text)
        );
        let descriptor = routed?;

        let (conversation, descriptor) = self
            .reply(conversation_id, descriptor, &sentiment)
            .await?;

        Ok(self.build_response(conversation, &intake.classification, descriptor, started))
    }

    async fn intake(
        &self,
        conversation_id: &str,
        text: &str,
        user_context: &UserContext,
    ) -> DomainResult<Intake> {
        let _guard = self.conversations.lock(conversation_id).await;

        let mut conversation = self
            .conversations
            .load_or_create(conversation_id, user_context)
            .await?;

        let mut recent = Vec::new();
        if conversation.status == ConversationStatus::Closed {
            tracing::info!("Reopening closed conversation {}", conversation_id);
            let context = TransitionContext::new(ConversationStatus::New, self.clock.now());
            conversation = self.conversations.apply_transition(conversation, &context).await?;
        } else {
            recent = self
                .message_repo
                .recent_inbound_intents(conversation_id, self.fallback_window as i64)
                .await?;
        }

        let prior_intent = recent.first().cloned().flatten();
        let prior_fallbacks = recent
            .iter()
            .take_while(|intent| intent.as_deref() == Some(FALLBACK_INTENT))
            .count();
        let classification = self.routing.classify_message(
            conversation_id,
            text,
            user_context,
            prior_intent.as_deref(),
        );

        let timestamp = self.next_timestamp(conversation_id).await?;
        let sender = user_context
            .user_id
            .clone()
            .or_else(|| conversation.customer_id.clone())
            .unwrap_or_else(|| CUSTOMER_SENDER.to_string());
        let message = Message::inbound(conversation_id, &sender, text, timestamp)
            .with_classification(&classification.intent, classification.confidence);
        let message = self.message_repo.append_message(&message).await?;
        let conversation = self.conversations.touch(conversation, timestamp).await?;

        self.conversations.publish(SystemEvent::MessageReceived {
            message_id: message.id.clone(),
            conversation_id: conversation_id.to_string(),
            intent: Some(classification.intent.clone()),
            timestamp: format_timestamp(&timestamp),
        });

        Ok(Intake {
            conversation,
            classification,
            prior_intent,
            prior_fallbacks,
        })
    }

    async fn route(
        &self,
        ai_active: bool,
        request: &RoutingRequest,
        classification: &Classification,
    ) -> DomainResult<Option<ResponseDescriptor>> {
        if !ai_active {
            tracing::debug!(
                "AI suppressed for conversation {}; no automated reply",
                request.conversation_id
            );
            return Ok(None);
        }

        match self.routing.respond(request, classification).await {
            Ok(descriptor) => Ok(Some(descriptor)),
            Err(RoutingError::Validation(msg)) => Err(DomainError::ValidationError(msg)),
            Err(other) => Err(DomainError::Internal(other.to_string())),
        }
    }

    async fn analyze_sentiment(&self, text: &str) -> SentimentSignal {
        let analyzer = &self.sentiment;
        match call_with_retry(self.sentiment_budget, move || analyzer.analyze(text)).await {
            Ok(signal) => signal,
            Err(e) => {
                tracing::warn!("Sentiment analysis unavailable: {}", e);
                SentimentSignal::neutral()
            }
        }
    }

    async fn reply(
        &self,
        conversation_id: &str,
        mut descriptor: Option<ResponseDescriptor>,
        sentiment: &SentimentSignal,
    ) -> DomainResult<(Conversation, Option<ResponseDescriptor>)> {
        let _guard = self.conversations.lock(conversation_id).await;
        let mut conversation = self.conversations.get_conversation(conversation_id).await?;

        if descriptor.is_some() && !conversation.ai_active() {
            tracing::info!(
                "AI was deactivated for {} while routing; dropping the automated reply",
                conversation_id
            );
            descriptor = None;
        }

        if let Some(reply) = &descriptor {
            let timestamp = self.next_timestamp(conversation_id).await?;
            let message = Message::outbound(conversation_id, ASSISTANT_SENDER, &reply.text, timestamp)
                .with_classification(&reply.intent, reply.confidence);
            let message = self.message_repo.append_message(&message).await?;

            conversation = if conversation.status == ConversationStatus::New {
                let context = TransitionContext::new(ConversationStatus::AiResponded, timestamp);
                self.conversations.apply_transition(conversation, &context).await?
            } else {
                self.conversations.touch(conversation, timestamp).await?
            };

            self.conversations.publish(SystemEvent::MessageSent {
                message_id: message.id,
                conversation_id: conversation_id.to_string(),
                source: reply.source.as_str().to_string(),
                timestamp: format_timestamp(&timestamp),
            });
        }

        if let Some(reason) = escalation_reason(descriptor.as_ref(), sentiment) {
            if conversation.status.is_unresolved() {
                conversation = self
                    .conversations
                    .escalation()
                    .escalate(conversation, &reason, None, None)
                    .await?;
            }
        }

        Ok((conversation, descriptor))
    }

    /// Strictly after the conversation's latest message, so display order
    /// matches arrival order even within one clock tick.
    async fn next_timestamp(&self, conversation_id: &str) -> DomainResult<DateTime<Utc>> {
        let now = self.clock.now();
        Ok(match self.message_repo.last_message(conversation_id).await? {
            Some(last) if last.timestamp >= now => last.timestamp + chrono::Duration::microseconds(1),
            _ => now,
        })
    }

    fn build_response(
        &self,
        conversation: Conversation,
        classification: &Classification,
        descriptor: Option<ResponseDescriptor>,
        started: Instant,
    ) -> ProcessMessageResponse {
        let mut actions = BTreeMap::new();
        let mut quick_replies = Vec::new();
        let mut response = None;
        let mut metadata = ResponseMetadata {
            intent: Some(classification.intent.clone()),
            source: None,
            confidence: classification.confidence,
            response_time_ms: started.elapsed().as_millis() as u64,
            cache_hit: false,
            live_data_used: false,
            escalate_candidate: classification.escalate_candidate,
            timestamp: self.clock.now(),
        };

        if let Some(descriptor) = descriptor {
            metadata.intent = Some(descriptor.intent.clone());
            metadata.source = Some(descriptor.source);
            metadata.confidence = descriptor.confidence;
            metadata.cache_hit = descriptor.cache_hit();
            metadata.live_data_used = descriptor.live_data_used();
            metadata.escalate_candidate = descriptor.escalate_candidate;
            quick_replies = descriptor.quick_replies;
            actions = descriptor.actions;
            response = Some(descriptor.text);
        }

        if conversation.status == ConversationStatus::Escalated {
            actions.insert("escalated".to_string(), json!(true));
            actions.insert("handoff_pending".to_string(), json!(conversation.handoff_pending));
        }

        ProcessMessageResponse {
            success: true,
            conversation_id: conversation.id,
            response,
            metadata,
            quick_replies,
            actions,
            error: None,
        }
    }

    fn failure(
        &self,
        conversation_id: &str,
        error: String,
        source: Option<ResponseSource>,
        started: Instant,
    ) -> ProcessMessageResponse {
        ProcessMessageResponse {
            success: false,
            conversation_id: conversation_id.to_string(),
            response: None,
            metadata: ResponseMetadata {
                intent: None,
                source,
                confidence: 0.0,
                response_time_ms: started.elapsed().as_millis() as u64,
                cache_hit: false,
                live_data_used: false,
                escalate_candidate: false,
                timestamp: self.clock.now(),
            },
            quick_replies: ERROR_QUICK_REPLIES.iter().map(|r| r.to_string()).collect(),
            actions: BTreeMap::new(),
            error: Some(error),
        }
    }
}

fn escalation_reason(
    descriptor: Option<&ResponseDescriptor>,
    sentiment: &SentimentSignal,
) -> Option<String> {
    if let Some(descriptor) = descriptor.filter(|d| d.escalate) {
        return Some(
            descriptor
                .escalation_reason
                .clone()
                .unwrap_or_else(|| reasons::AUTOMATION_FAILURE.to_string()),
        );
    }
    if sentiment.escalate_hint {
        return Some(
            sentiment
                .reason
                .clone()
                .unwrap_or_else(|| reasons::NEGATIVE_SENTIMENT.to_string()),
        );
    }
    None
}
