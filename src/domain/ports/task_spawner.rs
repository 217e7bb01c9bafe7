use futures::future::BoxFuture;

/// Spawns long-running background work (inactivity sweep, escalation notifier)
/// without tying services to a particular runtime.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, future: BoxFuture<'static, ()>);
}
