mod helpers;

use helpers::*;
use std::sync::Arc;
use std::time::Duration;
use support_router::domain::entities::{
    AiMode, ConversationFilter, ConversationStatus, EscalateRequest, MessageDirection, Priority,
};
use support_router::domain::errors::DomainError;
use support_router::domain::events::SystemEvent;
use support_router::domain::ports::event_bus::EventBus;
use support_router::domain::ports::ticketing_system::TicketingSystem;
use tokio_stream::StreamExt;
use tokio_test::assert_ok;

fn escalate_request(priority: Option<Priority>, reason: Option<&str>) -> EscalateRequest {
    EscalateRequest {
        priority,
        assignee: None,
        reason: reason.map(str::to_string),
    }
}

#[tokio::test]
async fn test_ai_off_suppresses_automated_reply() {
    let app = TestApp::new().await;
    let conversations = &app.state.conversation_service;

    app.send("conv-e", "Hello").await;
    conversations.set_ai_mode("conv-e", AiMode::Off).await.unwrap();

    let response = app.send("conv-e", "When are you open?").await;

    assert!(response.success);
    assert!(response.response.is_none());
    assert_eq!(response.metadata.source, None);
    assert_eq!(response.metadata.intent.as_deref(), Some("business_hours"));

    let messages = conversations.get_messages("conv-e", None).await.unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].direction, MessageDirection::Inbound);
}

#[tokio::test]
async fn test_ai_off_suppresses_reply_even_when_assigned() {
    let app = TestApp::new().await;
    let conversations = &app.state.conversation_service;

    app.send("conv-off-assigned", "Hello").await;
    conversations
        .assign("conv-off-assigned", "agent-1")
        .await
        .unwrap();
    conversations
        .set_ai_mode("conv-off-assigned", AiMode::Off)
        .await
        .unwrap();

    let response = app.send("conv-off-assigned", "Hello again").await;
    assert!(response.response.is_none());
}

#[tokio::test]
async fn test_auto_mode_goes_quiet_once_an_agent_is_assigned() {
    let app = TestApp::new().await;
    let conversations = &app.state.conversation_service;

    app.send("conv-auto", "Hello").await;
    conversations.assign("conv-auto", "agent-1").await.unwrap();
    let quiet = app.send("conv-auto", "Hello?").await;
    assert!(quiet.response.is_none());

    conversations.set_ai_mode("conv-auto", AiMode::On).await.unwrap();
    let loud = app.send("conv-auto", "Hello there").await;
    assert!(loud.response.is_some());
}

#[tokio::test]
async fn test_set_ai_mode_is_idempotent() {
    let app = TestApp::new().await;
    let conversations = &app.state.conversation_service;
    app.send("conv-mode", "Hello").await;

    let mut events = app.event_bus.subscribe();
    conversations.set_ai_mode("conv-mode", AiMode::Off).await.unwrap();
    let again = conversations.set_ai_mode("conv-mode", AiMode::Off).await.unwrap();
    assert_eq!(again.ai_mode, AiMode::Off);

    let mut mode_changes = 0;
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(100), events.next()).await
    {
        if matches!(event, Ok(SystemEvent::AiModeChanged { .. })) {
            mode_changes += 1;
        }
    }
    assert_eq!(mode_changes, 1);
}

#[tokio::test]
async fn test_first_reply_moves_new_to_ai_responded() {
    let app = TestApp::new().await;

    let response = app.send("conv-first", "Hello").await;
    assert!(response.success);

    let conversation = app
        .state
        .conversation_service
        .get_conversation("conv-first")
        .await
        .unwrap();
    assert_eq!(conversation.status, ConversationStatus::AiResponded);
    assert_eq!(conversation.channel, "web");
}

#[tokio::test]
async fn test_close_is_idempotent_and_new_message_reopens() {
    let app = TestApp::new().await;
    let conversations = &app.state.conversation_service;
    app.send("conv-close", "Hello").await;

    let closed = assert_ok!(conversations.close("conv-close").await);
    assert_eq!(closed.status, ConversationStatus::Closed);
    assert!(closed.closed_at.is_some());
    let again = assert_ok!(conversations.close("conv-close").await);
    assert_eq!(again.version, closed.version);

    app.send("conv-close", "Hello again").await;
    let reopened = conversations.get_conversation("conv-close").await.unwrap();
    assert_eq!(reopened.status, ConversationStatus::AiResponded);
}

#[tokio::test]
async fn test_assign_rules() {
    let app = TestApp::new().await;
    let conversations = &app.state.conversation_service;
    app.send("conv-assign", "Hello").await;

    let assigned = conversations.assign("conv-assign", "agent-1").await.unwrap();
    assert_eq!(assigned.status, ConversationStatus::AgentAssigned);
    assert_eq!(assigned.assigned_agent.as_deref(), Some("agent-1"));

    let same = conversations.assign("conv-assign", "agent-1").await.unwrap();
    assert_eq!(same.version, assigned.version);

    assert!(matches!(
        conversations.assign("conv-assign", "  ").await,
        Err(DomainError::ValidationError(_))
    ));
    assert!(matches!(
        conversations.assign("missing", "agent-1").await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_escalated_conversation_rejects_assignment() {
    let app = TestApp::new().await;
    let conversations = &app.state.conversation_service;
    app.send("conv-esc", "Hello").await;

    conversations
        .escalate("conv-esc", escalate_request(None, None))
        .await
        .unwrap();

    assert!(matches!(
        conversations.assign("conv-esc", "agent-1").await,
        Err(DomainError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_manual_escalation_defaults_and_never_downgrades() {
    let app = TestApp::new().await;
    let conversations = &app.state.conversation_service;
    app.send("conv-prio", "Hello").await;

    let escalated = conversations
        .escalate("conv-prio", escalate_request(Some(Priority::High), None))
        .await
        .unwrap();
    assert_eq!(escalated.status, ConversationStatus::Escalated);
    assert_eq!(escalated.escalation_reason.as_deref(), Some("manual"));
    assert_eq!(escalated.priority, Priority::High);
    assert!(escalated.escalated_at.is_some());

    let lower = conversations
        .escalate("conv-prio", escalate_request(Some(Priority::Low), Some("fraud")))
        .await
        .unwrap();
    assert_eq!(lower.priority, Priority::High);
    assert_eq!(lower.escalation_reason.as_deref(), Some("manual"));

    let higher = conversations
        .escalate("conv-prio", escalate_request(Some(Priority::Urgent), None))
        .await
        .unwrap();
    assert_eq!(higher.priority, Priority::Urgent);
}

#[tokio::test]
async fn test_escalation_hands_off_to_roster_agent_with_ticket() {
    let app = TestApp::builder()
        .agents("support", &["alice", "bob"])
        .build()
        .await;
    let conversations = &app.state.conversation_service;
    app.send("conv-handoff", "Hello").await;

    let escalated = conversations
        .escalate("conv-handoff", escalate_request(None, None))
        .await
        .unwrap();

    assert_eq!(escalated.assigned_agent.as_deref(), Some("alice"));
    assert!(!escalated.handoff_pending);
    assert!(escalated.ticket_id.is_some());
    assert_eq!(escalated.department.as_deref(), Some("support"));
}

#[tokio::test]
async fn test_explicit_assignee_overrides_roster() {
    let app = TestApp::builder().agents("support", &["alice"]).build().await;
    let conversations = &app.state.conversation_service;
    app.send("conv-assignee", "Hello").await;

    let escalated = conversations
        .escalate(
            "conv-assignee",
            EscalateRequest {
                priority: None,
                assignee: Some("carol".to_string()),
                reason: Some("billing_dispute".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(escalated.assigned_agent.as_deref(), Some("carol"));
    assert_eq!(escalated.department.as_deref(), Some("billing"));
    assert_eq!(escalated.priority, Priority::High);
}

#[tokio::test]
async fn test_ticketing_outage_defers_handoff() {
    let app = TestApp::builder()
        .agents("support", &["alice"])
        .ticketing(|inner| Arc::new(FlakyTicketing::failing(inner)) as Arc<dyn TicketingSystem>)
        .build()
        .await;
    let conversations = &app.state.conversation_service;
    app.send("conv-outage", "Hello").await;

    let escalated = conversations
        .escalate("conv-outage", escalate_request(None, None))
        .await
        .unwrap();

    assert_eq!(escalated.status, ConversationStatus::Escalated);
    assert!(escalated.handoff_pending);
    assert!(escalated.assigned_agent.is_none());
    assert!(escalated.ticket_id.is_none());
}

#[tokio::test]
async fn test_message_listing_limits() {
    let app = TestApp::new().await;
    let conversations = &app.state.conversation_service;
    app.send("conv-list", "Hello").await;
    app.send("conv-list", "Hello again").await;

    let latest = conversations.get_messages("conv-list", Some(2)).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[1].direction, MessageDirection::Outbound);

    assert!(matches!(
        conversations.get_messages("conv-list", Some(0)).await,
        Err(DomainError::ValidationError(_))
    ));
    assert!(matches!(
        conversations.get_messages("missing", None).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_conversations_filters_by_status() {
    let app = TestApp::new().await;
    let conversations = &app.state.conversation_service;
    app.send("conv-l1", "Hello").await;
    app.send("conv-l2", "Hello").await;
    conversations.close("conv-l2").await.unwrap();

    let closed = conversations
        .get_conversations(ConversationFilter {
            status: Some(ConversationStatus::Closed),
            ..ConversationFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(closed.total_count, 1);
    assert_eq!(closed.conversations[0].id, "conv-l2");

    let all = conversations
        .get_conversations(ConversationFilter::default())
        .await
        .unwrap();
    assert_eq!(all.total_count, 2);
}
