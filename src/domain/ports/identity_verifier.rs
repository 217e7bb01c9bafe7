use crate::domain::errors::UpstreamError;
use async_trait::async_trait;

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolve a customer-supplied identifier to a verified subject id.
    async fn verify(&self, identifier: &str) -> Result<Option<String>, UpstreamError>;
}
