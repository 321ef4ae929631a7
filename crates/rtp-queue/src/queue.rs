//! Bounded FIFO of discovered positions for one region.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};
use rtp_search::LocationSearcher;
use rtp_world::{Position, Region, WorldProvider};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::observer::{ObserverId, QueueEvent, QueueEventKind, QueueObserver};

/// A queued position and when it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub position: Position,
    pub found_at: Instant,
}

impl Candidate {
    /// Whether the candidate has sat in the queue for at least `threshold`.
    #[must_use]
    pub fn is_stale(&self, threshold: std::time::Duration) -> bool {
        self.found_at.elapsed() >= threshold
    }
}

/// Prefetched supply of safe positions for a region.
///
/// - `try_push` never blocks and never overwrites; a full queue rejects.
/// - `try_pop` hands out the oldest position exactly once.
/// - `fill` runs independent searches whose results are pushed as they
///   complete, dropped if the queue filled up in the meantime.
pub struct PrefetchQueue<W> {
    region: Region,
    capacity: usize,
    items: Mutex<VecDeque<Candidate>>,
    observers: RwLock<Vec<(ObserverId, Arc<dyn QueueObserver>)>>,
    next_observer: AtomicU32,
    searcher: Arc<LocationSearcher<W>>,
}

impl<W: WorldProvider> PrefetchQueue<W> {
    #[must_use]
    pub fn new(region: Region, capacity: usize, searcher: Arc<LocationSearcher<W>>) -> Self {
        Self {
            region,
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            observers: RwLock::new(Vec::new()),
            next_observer: AtomicU32::new(0),
            searcher,
        }
    }

    #[must_use]
    pub const fn region(&self) -> &Region {
        &self.region
    }

    #[must_use]
    pub const fn searcher(&self) -> &Arc<LocationSearcher<W>> {
        &self.searcher
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    /// Append a position if there is room.
    pub fn try_push(&self, position: Position) -> bool {
        let size = {
            let mut items = self.items.lock();
            if items.len() >= self.capacity {
                return false;
            }
            items.push_back(Candidate {
                position: position.clone(),
                found_at: Instant::now(),
            });
            items.len()
        };
        self.notify(QueueEventKind::Added, position, size);
        true
    }

    /// Remove the oldest position.
    pub fn try_pop(&self) -> Option<Candidate> {
        let (candidate, size) = {
            let mut items = self.items.lock();
            let candidate = items.pop_front()?;
            (candidate, items.len())
        };
        self.notify(QueueEventKind::Removed, candidate.position.clone(), size);
        Some(candidate)
    }

    /// Register an observer for add/remove events.
    pub fn subscribe(&self, observer: impl QueueObserver) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    fn notify(&self, kind: QueueEventKind, position: Position, size: usize) {
        // snapshot so observers may (un)subscribe without deadlocking
        let observers: Vec<_> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        if observers.is_empty() {
            return;
        }
        let event = QueueEvent {
            kind,
            position,
            size,
            capacity: self.capacity,
        };
        for observer in observers {
            observer.observe(&event);
        }
    }

    /// Start `count` background searches feeding this queue.
    ///
    /// Must be called from within a tokio runtime. Dropping the returned
    /// handle detaches the searches.
    pub fn fill(self: &Arc<Self>, count: usize) -> FillHandle {
        debug!(region = %self.region.id, count, "filling queue");
        let handles = (0..count)
            .map(|_| {
                let queue = Arc::clone(self);
                tokio::spawn(async move { queue.fill_one().await })
            })
            .collect();
        FillHandle { handles }
    }

    /// Start as many searches as there are free slots.
    pub fn fill_to_capacity(self: &Arc<Self>) -> FillHandle {
        self.fill(self.remaining_capacity())
    }

    async fn fill_one(&self) -> FillOutcome {
        match self.searcher.find(&self.region).await {
            Ok(position) => {
                if self.try_push(position) {
                    FillOutcome::Pushed
                } else {
                    debug!(region = %self.region.id, "queue full, discarding position");
                    FillOutcome::Discarded
                }
            }
            Err(err) => {
                warn!(region = %self.region.id, %err, "queue fill search failed");
                FillOutcome::Failed
            }
        }
    }
}

impl<W> std::fmt::Debug for PrefetchQueue<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchQueue")
            .field("region", &self.region.id)
            .field("size", &self.items.lock().len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillOutcome {
    Pushed,
    Discarded,
    Failed,
}

/// Tally of a finished fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub pushed: usize,
    pub discarded: usize,
    pub failed: usize,
}

/// Background searches started by [`PrefetchQueue::fill`].
#[derive(Debug)]
#[must_use = "dropping a FillHandle detaches the searches"]
pub struct FillHandle {
    handles: Vec<JoinHandle<FillOutcome>>,
}

impl FillHandle {
    /// Number of searches started.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every search to finish.
    pub async fn wait(self) -> FillReport {
        let mut report = FillReport::default();
        for handle in self.handles {
            match handle.await {
                Ok(FillOutcome::Pushed) => report.pushed += 1,
                Ok(FillOutcome::Discarded) => report.discarded += 1,
                Ok(FillOutcome::Failed) | Err(_) => report.failed += 1,
            }
        }
        report
    }

    /// Let the searches run on without waiting.
    pub fn detach(self) {
        drop(self.handles);
    }
}
