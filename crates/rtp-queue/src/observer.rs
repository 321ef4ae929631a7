//! Queue change notifications.

use rtp_world::Position;
use tracing::info;

/// Unique identifier for a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u32);

impl ObserverId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEventKind {
    Added,
    Removed,
}

/// A single add or remove, reported after the queue has already changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEvent {
    pub kind: QueueEventKind,
    pub position: Position,
    /// Queue size after the change.
    pub size: usize,
    pub capacity: usize,
}

/// Trait for queue observers.
///
/// Observers run synchronously on the thread that changed the queue, after
/// its lock is released. They only see the event, never the queue itself.
pub trait QueueObserver: Send + Sync + 'static {
    fn observe(&self, event: &QueueEvent);
}

// Implement QueueObserver for closures
impl<F> QueueObserver for F
where
    F: Fn(&QueueEvent) + Send + Sync + 'static,
{
    fn observe(&self, event: &QueueEvent) {
        self(event);
    }
}

/// Observer logging queue population changes.
pub fn population_logger() -> impl QueueObserver {
    |event: &QueueEvent| match event.kind {
        QueueEventKind::Added => info!(
            "Safe location added for {} ({}/{})",
            event.position.region, event.size, event.capacity
        ),
        QueueEventKind::Removed => info!(
            "Safe location consumed for {} ({}/{})",
            event.position.region, event.size, event.capacity
        ),
    }
}
