use crate::domain::errors::DomainResult;
use crate::domain::events::SystemEvent;
use futures::Stream;
use std::pin::Pin;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<SystemEvent, BroadcastStreamRecvError>> + Send>>;

pub trait EventBus: Send + Sync {
    /// Publish an event to all subscribers
    fn publish(&self, event: SystemEvent) -> DomainResult<()>;

    /// Subscribe to events published after this call
    fn subscribe(&self) -> EventStream;
}
