use crate::domain::entities::IntentCategory;
use crate::domain::errors::UpstreamError;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct KnowledgeRequest {
    pub conversation_id: String,
    pub intent: String,
    /// `None` for the fallback intent (open-ended AI answer).
    pub category: Option<IntentCategory>,
    pub message: String,
}

/// AI / knowledge text generator. Opaque text in, text out; may fail or hang.
#[async_trait]
pub trait KnowledgeResponder: Send + Sync {
    async fn respond(&self, request: &KnowledgeRequest) -> Result<String, UpstreamError>;
}
