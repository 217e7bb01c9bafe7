use crate::domain::errors::UpstreamError;
use crate::domain::ports::knowledge_responder::{KnowledgeRequest, KnowledgeResponder};
use async_trait::async_trait;
use std::collections::HashMap;

const GENERIC_HELP: &str = "I'm not sure I understood that. I can help with claim status, \
     policy details, billing and payments, or connect you with an agent.";

/// Knowledge responder backed by a fixed article per intent.
///
/// Used when no AI responder endpoint is configured, and in tests.
pub struct TemplateKnowledgeResponder {
    articles: HashMap<String, String>,
    fallback: String,
}

impl TemplateKnowledgeResponder {
    pub fn new(articles: HashMap<String, String>, fallback: &str) -> Self {
        Self {
            articles,
            fallback: fallback.to_string(),
        }
    }

    pub fn with_article(mut self, intent: &str, text: &str) -> Self {
        self.articles.insert(intent.to_string(), text.to_string());
        self
    }
}

impl Default for TemplateKnowledgeResponder {
    fn default() -> Self {
        let articles = [
            ("greeting", "Hello! How can I help you today?"),
            (
                "business_hours",
                "Our support team is available Monday to Friday, 9am to 5pm. \
                 Outside those hours I can still answer most questions.",
            ),
            (
                "contact_info",
                "You can reach us at 1-800-555-0100 or support@example.com.",
            ),
            (
                "file_claim",
                "To file a new claim, sign in to the member portal and choose \
                 'File a claim', or reply here with what happened and I'll get you started.",
            ),
            (
                "reset_password",
                "You can reset your password from the sign-in page using 'Forgot password'. \
                 A reset link will be sent to the email on your account.",
            ),
            (
                "speak_to_agent",
                "I'm connecting you with a member of our support team.",
            ),
        ];

        Self::new(
            articles
                .into_iter()
                .map(|(intent, text)| (intent.to_string(), text.to_string()))
                .collect(),
            GENERIC_HELP,
        )
    }
}

#[async_trait]
impl KnowledgeResponder for TemplateKnowledgeResponder {
    async fn respond(&self, request: &KnowledgeRequest) -> Result<String, UpstreamError> {
        Ok(self
            .articles
            .get(&request.intent)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(intent: &str) -> KnowledgeRequest {
        KnowledgeRequest {
            conversation_id: "c1".to_string(),
            intent: intent.to_string(),
            category: None,
            message: "hi".to_string(),
        }
    }

    #[tokio::test]
    async fn test_known_intent_gets_article() {
        let responder = TemplateKnowledgeResponder::default();
        let text = responder.respond(&request("greeting")).await.unwrap();
        assert!(text.starts_with("Hello"));
    }

    #[tokio::test]
    async fn test_unknown_intent_gets_generic_help() {
        let responder = TemplateKnowledgeResponder::default();
        assert_eq!(responder.respond(&request("fallback")).await.unwrap(), GENERIC_HELP);
    }
}
