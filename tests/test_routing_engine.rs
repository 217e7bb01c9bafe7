mod helpers;

use chrono::Duration as ChronoDuration;
use helpers::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use support_router::domain::entities::{
    ConversationStatus, MessageDirection, ResponseSource, UserContext, FALLBACK_INTENT,
};
use support_router::infrastructure::providers::CannedDataSource;

fn member() -> UserContext {
    UserContext::authenticated(MEMBER_SUBJECT, "web")
}

#[tokio::test]
async fn test_live_data_for_authenticated_user_populates_cache() {
    let app = TestApp::new().await;

    let response = app
        .send_as("conv-a", "What is my claim status?", member())
        .await;

    assert!(response.success);
    assert_eq!(response.metadata.intent.as_deref(), Some("claim_status"));
    assert_eq!(response.metadata.source, Some(ResponseSource::LiveData));
    assert!(response.metadata.live_data_used);
    assert!(!response.metadata.cache_hit);
    assert!(response.response.is_some());
    assert!(!app.state.cache.is_empty());
}

#[tokio::test]
async fn test_repeat_question_within_ttl_is_served_from_cache() {
    let app = TestApp::new().await;

    let first = app
        .send_as("conv-b1", "What is my claim status?", member())
        .await;
    let second = app
        .send_as("conv-b2", "What is my claim status?", member())
        .await;

    assert_eq!(first.metadata.source, Some(ResponseSource::LiveData));
    assert_eq!(second.metadata.source, Some(ResponseSource::Cache));
    assert!(second.metadata.cache_hit);
    assert_eq!(first.response, second.response);
}

#[tokio::test]
async fn test_live_data_cache_expires_after_ttl() {
    let app = TestApp::new().await;

    app.send_as("conv-ttl-1", "What is my claim status?", member())
        .await;
    app.clock.advance(ChronoDuration::seconds(301));
    let after = app
        .send_as("conv-ttl-2", "What is my claim status?", member())
        .await;

    assert_eq!(after.metadata.source, Some(ResponseSource::LiveData));
}

#[tokio::test]
async fn test_missing_record_is_answered_but_not_cached() {
    let source = CannedDataSource::empty();
    let app = TestApp::builder()
        .data_source(Arc::new(source))
        .build()
        .await;

    let first = app
        .send_as("conv-nr-1", "What is my claim status?", member())
        .await;
    let second = app
        .send_as("conv-nr-2", "What is my claim status?", member())
        .await;

    assert_eq!(first.metadata.source, Some(ResponseSource::LiveData));
    assert_eq!(second.metadata.source, Some(ResponseSource::LiveData));
}

#[tokio::test]
async fn test_gibberish_falls_back_with_generic_help() {
    let app = TestApp::new().await;

    let response = app.send("conv-c", "asdkjqwe").await;

    assert!(response.success);
    assert_eq!(response.metadata.intent.as_deref(), Some(FALLBACK_INTENT));
    assert_eq!(response.metadata.confidence, 0.0);
    assert_eq!(response.metadata.source, Some(ResponseSource::Ai));
    assert!(response.metadata.escalate_candidate);
    assert!(response.response.unwrap().contains("not sure"));
    assert!(!response.quick_replies.is_empty());

    let conversation = app
        .state
        .conversation_service
        .get_conversation("conv-c")
        .await
        .unwrap();
    assert_eq!(conversation.status, ConversationStatus::AiResponded);
}

#[tokio::test]
async fn test_repeated_fallback_escalates_on_third_message() {
    let app = TestApp::new().await;

    app.send("conv-rf", "asdkjqwe").await;
    let second = app.send("conv-rf", "qwpoeiru").await;
    assert!(!second.actions.contains_key("escalated"));

    let third = app.send("conv-rf", "zxmcnvb").await;
    assert_eq!(third.actions.get("escalated"), Some(&serde_json::json!(true)));

    let conversation = app
        .state
        .conversation_service
        .get_conversation("conv-rf")
        .await
        .unwrap();
    assert_eq!(conversation.status, ConversationStatus::Escalated);
    assert_eq!(
        conversation.escalation_reason.as_deref(),
        Some("repeated_fallback")
    );
}

#[tokio::test]
async fn test_hanging_responder_degrades_within_deadline() {
    let app = TestApp::builder()
        .responder(Arc::new(HangingResponder))
        .build()
        .await;

    let started = Instant::now();
    let response = app.send("conv-timeout", "Hello").await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(response.success);
    assert_eq!(response.metadata.source, Some(ResponseSource::Error));
    assert_eq!(
        response.quick_replies,
        vec!["Try again".to_string(), "Contact support".to_string()]
    );
    assert_eq!(
        response.actions.get("error"),
        Some(&serde_json::json!("upstream_timeout"))
    );

    let conversation = app
        .state
        .conversation_service
        .get_conversation("conv-timeout")
        .await
        .unwrap();
    assert_eq!(conversation.status, ConversationStatus::Escalated);
    assert_eq!(
        conversation.escalation_reason.as_deref(),
        Some("automation_failure")
    );
}

#[tokio::test]
async fn test_knowledge_answers_are_cached() {
    let responder = Arc::new(CountingResponder::default());
    let app = TestApp::builder()
        .responder(responder.clone())
        .build()
        .await;

    let first = app.send("conv-kb-1", "When are you open?").await;
    let second = app.send("conv-kb-2", "When are you open?").await;

    assert_eq!(first.metadata.source, Some(ResponseSource::KnowledgeBase));
    assert_eq!(second.metadata.source, Some(ResponseSource::Cache));
    assert_eq!(responder.calls(), 1);
}

#[tokio::test]
async fn test_speak_to_agent_escalates_with_customer_request() {
    let app = TestApp::builder().agents("support", &["alice"]).build().await;

    let response = app.send("conv-human", "Can I talk to a real person").await;

    assert_eq!(response.metadata.intent.as_deref(), Some("speak_to_agent"));
    assert_eq!(response.actions.get("escalated"), Some(&serde_json::json!(true)));

    let conversation = app
        .state
        .conversation_service
        .get_conversation("conv-human")
        .await
        .unwrap();
    assert_eq!(
        conversation.escalation_reason.as_deref(),
        Some("customer_request")
    );
    assert_eq!(conversation.assigned_agent.as_deref(), Some("alice"));
    assert!(!conversation.handoff_pending);
}

#[tokio::test]
async fn test_unverified_user_is_prompted_then_verified_with_member_id() {
    let app = TestApp::new().await;

    let prompt = app.send("conv-auth", "What is my claim status?").await;
    assert_eq!(prompt.metadata.source, Some(ResponseSource::KnowledgeBase));
    assert_eq!(
        prompt.actions.get("auth_required"),
        Some(&serde_json::json!(true))
    );

    let verified = app
        .send("conv-auth", &format!("my member id is {}", MEMBER_ID))
        .await;
    assert_eq!(verified.metadata.source, Some(ResponseSource::LiveData));
    assert_eq!(verified.metadata.intent.as_deref(), Some("claim_status"));
    assert!(verified
        .response
        .unwrap()
        .starts_with("Thanks, you're verified."));
    assert_eq!(
        verified.actions.get("verified"),
        Some(&serde_json::json!(true))
    );
}

#[tokio::test]
async fn test_unknown_identifier_asks_again() {
    let app = TestApp::new().await;

    app.send("conv-bad-id", "What is my policy deductible?").await;
    let retry = app.send("conv-bad-id", "ZZ999999").await;

    assert_eq!(
        retry.actions.get("auth_required"),
        Some(&serde_json::json!(true))
    );
    assert_eq!(retry.metadata.source, Some(ResponseSource::KnowledgeBase));
}

#[tokio::test]
async fn test_logout_requires_verification_again() {
    let app = TestApp::new().await;

    app.send("conv-logout", "What is my claim status?").await;
    app.send("conv-logout", MEMBER_ID).await;

    let logout = app
        .state
        .conversation_service
        .logout("conv-logout")
        .await
        .unwrap();
    assert!(logout.invalidated_entries >= 1);

    let again = app.send("conv-logout", "What is my claim status?").await;
    assert_eq!(
        again.actions.get("auth_required"),
        Some(&serde_json::json!(true))
    );
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let app = TestApp::new().await;

    let response = app.send("conv-empty", "   ").await;

    assert!(!response.success);
    assert!(response.error.is_some());
    assert_eq!(response.metadata.source, None);
    assert!(app
        .state
        .conversation_service
        .get_conversation("conv-empty")
        .await
        .is_err());
}

#[tokio::test]
async fn test_monitor_counts_routed_responses() {
    let app = TestApp::new().await;

    app.send_as("conv-m1", "What is my claim status?", member())
        .await;
    app.send_as("conv-m2", "What is my claim status?", member())
        .await;
    app.send("conv-m3", "asdkjqwe").await;

    let snapshot = app.state.monitor.snapshot();
    assert_eq!(snapshot.total_requests, 3);
    assert_eq!(snapshot.cache_hits, 1);
    assert_eq!(snapshot.live_data_responses, 1);
    assert_eq!(snapshot.ai_responses, 1);
}

#[tokio::test]
async fn test_second_user_on_shared_conversation_sees_own_record() {
    let source = CannedDataSource::empty()
        .with_record(
            "claim",
            "cust-1",
            serde_json::json!({"claim_number": "CLM-111111", "status": "approved", "updated_at": "2024-03-01"}),
        )
        .with_record(
            "claim",
            "cust-2",
            serde_json::json!({"claim_number": "CLM-222222", "status": "received", "updated_at": "2024-03-02"}),
        );
    let app = TestApp::builder()
        .data_source(Arc::new(source))
        .build()
        .await;

    let first = app
        .send_as(
            "conv-shared",
            "What is my claim status?",
            UserContext::authenticated("cust-1", "web"),
        )
        .await;
    let second = app
        .send_as(
            "conv-shared",
            "What is my claim status?",
            UserContext::authenticated("cust-2", "web"),
        )
        .await;

    assert!(first.response.unwrap().contains("CLM-111111"));
    assert_eq!(second.metadata.source, Some(ResponseSource::LiveData));
    let text = second.response.unwrap();
    assert!(text.contains("CLM-222222"));
    assert!(!text.contains("CLM-111111"));
}

#[tokio::test]
async fn test_storage_failure_returns_apology_and_escalates() {
    let app = TestApp::new().await;
    app.send("conv-broken", "Hello").await;

    sqlx::query("DROP TABLE messages")
        .execute(app.db.pool())
        .await
        .unwrap();

    let response = app.send("conv-broken", "Hello again").await;

    assert!(!response.success);
    assert_eq!(response.metadata.source, Some(ResponseSource::Error));
    assert!(response.response.unwrap().contains("trouble"));
    assert_eq!(response.error.as_deref(), Some("internal_fault"));
    assert_eq!(
        response.quick_replies,
        vec!["Try again".to_string(), "Contact support".to_string()]
    );
    assert_eq!(response.actions.get("escalate"), Some(&serde_json::json!(true)));
    assert_eq!(response.actions.get("escalated"), Some(&serde_json::json!(true)));

    let conversation = app
        .state
        .conversation_service
        .get_conversation("conv-broken")
        .await
        .unwrap();
    assert_eq!(conversation.status, ConversationStatus::Escalated);
    assert_eq!(
        conversation.escalation_reason.as_deref(),
        Some("automation_failure")
    );
}

#[tokio::test]
async fn test_identifier_reply_does_not_count_toward_fallback_streak() {
    let app = TestApp::new().await;

    app.send("conv-verify-streak", "What is my claim status?").await;
    app.send("conv-verify-streak", MEMBER_ID).await;
    app.send("conv-verify-streak", "asdkjqwe").await;
    let second_unclear = app.send("conv-verify-streak", "qwpoeiru").await;

    assert!(!second_unclear.actions.contains_key("escalated"));

    let inbound_intents: Vec<Option<String>> = app
        .state
        .conversation_service
        .get_messages("conv-verify-streak", None)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.direction == MessageDirection::Inbound)
        .map(|m| m.intent)
        .collect();
    assert_eq!(
        inbound_intents,
        vec![
            Some("claim_status".to_string()),
            Some("claim_status".to_string()),
            Some(FALLBACK_INTENT.to_string()),
            Some(FALLBACK_INTENT.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_logout_of_session_user_clears_cached_data() {
    let app = TestApp::new().await;

    let before = app
        .send_as("conv-session-logout", "What is my claim status?", member())
        .await;
    assert_eq!(before.metadata.source, Some(ResponseSource::LiveData));

    let logout = app
        .state
        .conversation_service
        .logout("conv-session-logout")
        .await
        .unwrap();
    assert!(logout.invalidated_entries >= 1);

    let anonymous = app
        .send("conv-session-logout", "What is my claim status?")
        .await;
    assert_eq!(
        anonymous.actions.get("auth_required"),
        Some(&serde_json::json!(true))
    );

    // The channel still vouches for the session, so the user is re-verified
    // without a prompt and the record is fetched fresh.
    let after = app
        .send_as("conv-session-logout", "What is my claim status?", member())
        .await;
    assert_eq!(after.metadata.source, Some(ResponseSource::LiveData));
    assert!(!after.actions.contains_key("auth_required"));
}
