use crate::domain::errors::UpstreamError;
use async_trait::async_trait;

pub type OperationalRecord = serde_json::Map<String, serde_json::Value>;

/// Authoritative operational data (claims, policies, billing).
#[async_trait]
pub trait OperationalDataSource: Send + Sync {
    /// `Ok(None)` means the identifier has no record of that kind.
    async fn fetch(
        &self,
        record_kind: &str,
        identifier: &str,
    ) -> Result<Option<OperationalRecord>, UpstreamError>;
}
