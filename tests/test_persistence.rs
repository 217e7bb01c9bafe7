mod helpers;

use chrono::{TimeZone, Utc};
use helpers::*;
use support_router::domain::entities::{
    Conversation, ConversationStatus, Message, MessageDirection, Priority, Ticket,
};
use support_router::domain::ports::conversation_repository::ConversationRepository;
use support_router::domain::ports::message_repository::MessageRepository;
use support_router::domain::ports::ticket_repository::TicketRepository;

#[tokio::test]
async fn test_new_conversation_with_null_columns_reads_back() {
    let db = setup_test_db().await;
    let now = Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap();
    let conversation = Conversation::new("conv-null".to_string(), "web".to_string(), None, None, false, now);
    db.create_conversation(&conversation).await.unwrap();

    let stored = db
        .get_conversation_by_id("conv-null")
        .await
        .unwrap()
        .expect("conversation should exist");

    assert_eq!(stored.status, ConversationStatus::New);
    assert!(stored.customer_id.is_none());
    assert!(stored.customer_role.is_none());
    assert!(stored.assigned_agent.is_none());
    assert!(stored.department.is_none());
    assert!(stored.escalation_reason.is_none());
    assert!(stored.escalated_at.is_none());
    assert!(stored.ticket_id.is_none());
    assert!(stored.closed_at.is_none());
    assert_eq!(stored.created_at, now);

    let mut escalated = stored.clone();
    escalated.status = ConversationStatus::Escalated;
    escalated.escalation_reason = Some("manual".to_string());
    escalated.escalated_at = Some(now);
    let updated = db.update_conversation(&escalated).await.unwrap();
    assert_eq!(updated.escalated_at, Some(now));
    assert_eq!(updated.escalation_reason.as_deref(), Some("manual"));
}

#[tokio::test]
async fn test_unclassified_message_reads_back_without_intent() {
    let db = setup_test_db().await;
    let now = Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap();
    let conversation = Conversation::new("conv-msg".to_string(), "web".to_string(), None, None, false, now);
    db.create_conversation(&conversation).await.unwrap();

    let reply = Message::outbound("conv-msg", "assistant", "Hi there", now);
    db.append_message(&reply).await.unwrap();
    let question = Message::inbound("conv-msg", "cust-1", "Hello", now).with_classification("greeting", 0.9);
    db.append_message(&question).await.unwrap();

    let messages = db.get_messages("conv-msg", 10).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].direction, MessageDirection::Inbound);
    assert_eq!(messages[0].intent.as_deref(), Some("greeting"));
    assert!(messages[1].intent.is_none());
    assert!(messages[1].confidence.is_none());

    let intents = db.recent_inbound_intents("conv-msg", 5).await.unwrap();
    assert_eq!(intents, vec![Some("greeting".to_string())]);
}

#[tokio::test]
async fn test_ticket_without_assignee_reads_back() {
    let db = setup_test_db().await;
    let now = Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap();
    let conversation = Conversation::new("conv-ticket".to_string(), "web".to_string(), None, None, false, now);
    db.create_conversation(&conversation).await.unwrap();

    let ticket = Ticket {
        id: "ticket-1".to_string(),
        conversation_id: "conv-ticket".to_string(),
        status: ConversationStatus::Escalated,
        priority: Priority::High,
        assignee: None,
        department: None,
        created_at: now,
        updated_at: now,
    };
    db.create_ticket(&ticket).await.unwrap();

    let stored = db
        .get_ticket_by_conversation("conv-ticket")
        .await
        .unwrap()
        .expect("ticket should exist");
    assert_eq!(stored.id, "ticket-1");
    assert!(stored.assignee.is_none());
    assert!(stored.department.is_none());
}
