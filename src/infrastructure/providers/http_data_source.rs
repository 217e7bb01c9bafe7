use super::map_reqwest_error;
use crate::domain::errors::UpstreamError;
use crate::domain::ports::operational_data_source::{OperationalDataSource, OperationalRecord};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

const COLLABORATOR: &str = "data_source";

/// Operational data over HTTP: `GET {base}/{kind}/{identifier}` returning a
/// JSON object, or 404 when there is no record.
pub struct HttpDataSource {
    client: Client,
    base_url: String,
}

impl HttpDataSource {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl OperationalDataSource for HttpDataSource {
    async fn fetch(
        &self,
        record_kind: &str,
        identifier: &str,
    ) -> Result<Option<OperationalRecord>, UpstreamError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| UpstreamError::Unavailable {
            collaborator: COLLABORATOR,
            reason: format!("invalid base url: {}", e),
        })?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::Unavailable {
                collaborator: COLLABORATOR,
                reason: "base url cannot have path segments".to_string(),
            })?
            .push(record_kind)
            .push(identifier);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(COLLABORATOR, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(UpstreamError::Unavailable {
                    collaborator: COLLABORATOR,
                    reason: format!("HTTP {}", status.as_u16()),
                })
            }
            _ => {}
        }

        let body: serde_json::Value = response.json().await.map_err(|e| UpstreamError::Malformed {
            collaborator: COLLABORATOR,
            reason: e.to_string(),
        })?;
        match body {
            serde_json::Value::Object(record) => Ok(Some(record)),
            other => Err(UpstreamError::Malformed {
                collaborator: COLLABORATOR,
                reason: format!("expected a JSON object, got {}", other),
            }),
        }
    }
}
