use async_trait::async_trait;

#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// An agent able to take a hand-off for `department`, if any.
    async fn find_available_agent(&self, department: &str) -> Option<String>;
}
