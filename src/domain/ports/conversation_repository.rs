use crate::domain::entities::{Conversation, ConversationFilter};
use crate::domain::errors::DomainResult;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn create_conversation(&self, conversation: &Conversation) -> DomainResult<()>;

    async fn get_conversation_by_id(&self, id: &str) -> DomainResult<Option<Conversation>>;

    /// Persist `conversation` if the stored version still equals `conversation.version`.
    ///
    /// Returns the stored record with its version incremented, or
    /// `DomainError::Conflict` when another writer got there first.
    async fn update_conversation(&self, conversation: &Conversation) -> DomainResult<Conversation>;

    async fn list_conversations(&self, filter: &ConversationFilter) -> DomainResult<Vec<Conversation>>;

    async fn count_conversations(&self, filter: &ConversationFilter) -> DomainResult<i64>;

    /// Unresolved conversations whose last activity is older than `cutoff`.
    async fn find_inactive_conversations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DomainResult<Vec<Conversation>>;

    /// Escalated conversations still waiting for a human hand-off.
    async fn find_pending_handoffs(&self) -> DomainResult<Vec<Conversation>>;
}
