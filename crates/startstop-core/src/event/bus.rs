//! Lifecycle event fan-out.
//!
//! One `EventBus` per controller. The controller and its runner publish;
//! any number of observers subscribe. Delivery is best-effort: a slow
//! subscriber lags and loses the oldest events, and nothing blocks the run.
//! Callers waiting on a run never depend on this channel.

use startstop_types::LifecycleEvent;
use tokio::sync::broadcast;

/// Broadcast channel of `LifecycleEvent`s. Clones share the channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    /// `capacity` is the per-subscriber backlog; zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    /// Fan `event` out to current subscribers and return how many got it.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        tracing::trace!(event = %event.name(), run_id = %event.run_id(), "lifecycle event");
        self.tx.send(event).unwrap_or(0)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
