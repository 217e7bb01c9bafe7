use super::map_reqwest_error;
use crate::domain::errors::UpstreamError;
use crate::domain::ports::knowledge_responder::{KnowledgeRequest, KnowledgeResponder};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const COLLABORATOR: &str = "ai_responder";

#[derive(Deserialize)]
struct ResponderReply {
    text: Option<String>,
}

/// Knowledge responder that POSTs the request to an external AI service and
/// expects `{"text": "..."}` back.
///
/// Deadlines are enforced by the caller; the client itself has no timeout.
pub struct HttpKnowledgeResponder {
    client: Client,
    endpoint: String,
}

impl HttpKnowledgeResponder {
    pub fn new(endpoint: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl KnowledgeResponder for HttpKnowledgeResponder {
    async fn respond(&self, request: &KnowledgeRequest) -> Result<String, UpstreamError> {
        let body = json!({
            "conversation_id": request.conversation_id,
            "intent": request.intent,
            "category": request.category,
            "message": request.message,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(COLLABORATOR, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Unavailable {
                collaborator: COLLABORATOR,
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let reply: ResponderReply = response.json().await.map_err(|e| UpstreamError::Malformed {
            collaborator: COLLABORATOR,
            reason: e.to_string(),
        })?;

        match reply.text.map(|t| t.trim().to_string()) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(UpstreamError::Malformed {
                collaborator: COLLABORATOR,
                reason: "reply has no text".to_string(),
            }),
        }
    }
}
