//! Live-data retrieval for live-data intents.
//!
//! Each intent maps to a record kind in the operational data source and a
//! text template. `{field}` placeholders are filled from the fetched record.

use crate::application::services::upstream::{call_with_retry, CallBudget};
use crate::domain::errors::UpstreamError;
use crate::domain::ports::operational_data_source::{OperationalDataSource, OperationalRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const COLLABORATOR: &str = "data_source";

#[derive(Debug, Clone)]
pub struct DataTemplate {
    pub intent: String,
    pub record_kind: String,
    pub template: String,
    pub not_found: String,
}

impl DataTemplate {
    pub fn new(intent: &str, record_kind: &str, template: &str, not_found: &str) -> Self {
        Self {
            intent: intent.to_string(),
            record_kind: record_kind.to_string(),
            template: template.to_string(),
            not_found: not_found.to_string(),
        }
    }
}

/// Rendered live-data answer; this is also the cached payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveDataAnswer {
    pub text: String,
    pub record_found: bool,
}

pub struct DataTemplateProvider {
    templates: Vec<DataTemplate>,
    source: Arc<dyn OperationalDataSource>,
    budget: CallBudget,
}

impl DataTemplateProvider {
    pub fn new(
        templates: Vec<DataTemplate>,
        source: Arc<dyn OperationalDataSource>,
        deadline: std::time::Duration,
        retry_factor: f64,
    ) -> Self {
        Self {
            templates,
            source,
            budget: CallBudget::new(COLLABORATOR, deadline, retry_factor),
        }
    }

    pub fn supports(&self, intent: &str) -> bool {
        self.template_for(intent).is_some()
    }

    /// Fetch and render the answer for `intent` about `subject`.
    pub async fn answer(&self, intent: &str, subject: &str) -> Result<LiveDataAnswer, UpstreamError> {
        let template = self.template_for(intent).ok_or_else(|| UpstreamError::Malformed {
            collaborator: COLLABORATOR,
            reason: format!("no data template for intent {}", intent),
        })?;

        let source = &self.source;
        let kind = template.record_kind.as_str();
        let record = call_with_retry(self.budget, move || source.fetch(kind, subject)).await?;

        match record {
            Some(record) => Ok(LiveDataAnswer {
                text: render(&template.template, &record)?,
                record_found: true,
            }),
            None => {
                tracing::info!("No {} record found for subject {}", kind, subject);
                Ok(LiveDataAnswer {
                    text: template.not_found.clone(),
                    record_found: false,
                })
            }
        }
    }

    fn template_for(&self, intent: &str) -> Option<&DataTemplate> {
        self.templates.iter().find(|t| t.intent == intent)
    }
}

/// Fill `{field}` placeholders. A placeholder with no matching field is a
/// malformed payload.
pub fn render(template: &str, record: &OperationalRecord) -> Result<String, UpstreamError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };

        let field = &after[..end];
        let value = record.get(field).ok_or_else(|| UpstreamError::Malformed {
            collaborator: COLLABORATOR,
            reason: format!("record is missing field '{}'", field),
        })?;
        match value {
            serde_json::Value::String(s) => out.push_str(s),
            serde_json::Value::Null => out.push_str("n/a"),
            other => out.push_str(&other.to_string()),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

pub fn default_templates() -> Vec<DataTemplate> {
    vec![
        DataTemplate::new(
            "claim_status",
            "claim",
            "Your claim {claim_number} is currently {status}. Last updated {updated_at}.",
            "I couldn't find an open claim on your account.",
        ),
        DataTemplate::new(
            "policy_details",
            "policy",
            "Policy {policy_number} ({plan}) is {status}. Deductible: {deductible}. Renews on {renewal_date}.",
            "I couldn't find an active policy on your account.",
        ),
        DataTemplate::new(
            "billing_balance",
            "billing",
            "Your current balance is {balance}, due on {due_date}.",
            "There is no outstanding balance on your account.",
        ),
        DataTemplate::new(
            "payment_status",
            "payment",
            "Your last payment of {amount} on {paid_at} is {status}.",
            "I couldn't find any recent payments on your account.",
        ),
    ]
}
