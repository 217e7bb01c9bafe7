use crate::domain::entities::Message;
use crate::domain::errors::DomainResult;

#[async_trait::async_trait]
pub trait MessageRepository: Send + Sync {
    /// Append a message, assigning the next sequence number in its conversation.
    async fn append_message(&self, message: &Message) -> DomainResult<Message>;

    /// The latest `limit` messages, returned oldest first.
    async fn get_messages(&self, conversation_id: &str, limit: i64) -> DomainResult<Vec<Message>>;

    /// Intents of the latest inbound messages, newest first.
    async fn recent_inbound_intents(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> DomainResult<Vec<Option<String>>>;

    async fn last_message(&self, conversation_id: &str) -> DomainResult<Option<Message>>;
}
