//! Post-relocation protection windows.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::request::RequesterId;

struct Timer {
    deadline: Instant,
    generation: u64,
    expiry: JoinHandle<()>,
}

/// At most one running timer per requester; arming again replaces it.
#[derive(Default)]
pub struct GraceTimers {
    timers: Mutex<HashMap<RequesterId, Timer>>,
    generation: Mutex<u64>,
}

impl GraceTimers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a window of `duration` for `requester`, cancelling any running one.
    /// Needs a tokio runtime.
    pub fn arm(self: &Arc<Self>, requester: RequesterId, duration: Duration) {
        let generation = {
            let mut counter = self.generation.lock();
            *counter += 1;
            *counter
        };

        let timers = Arc::downgrade(self);
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(timers) = timers.upgrade() {
                timers.expire(requester, generation);
            }
        });

        let previous = self.timers.lock().insert(
            requester,
            Timer {
                deadline: Instant::now() + duration,
                generation,
                expiry,
            },
        );
        if let Some(previous) = previous {
            previous.expiry.abort();
            debug!(%requester, "replaced grace timer");
        }
    }

    fn expire(&self, requester: RequesterId, generation: u64) {
        let mut timers = self.timers.lock();
        if timers
            .get(&requester)
            .is_some_and(|timer| timer.generation == generation)
        {
            timers.remove(&requester);
            debug!(%requester, "grace timer expired");
        }
    }

    #[must_use]
    pub fn is_active(&self, requester: RequesterId) -> bool {
        self.remaining(requester).is_some()
    }

    #[must_use]
    pub fn remaining(&self, requester: RequesterId) -> Option<Duration> {
        let deadline = self.timers.lock().get(&requester)?.deadline;
        let now = Instant::now();
        (deadline > now).then(|| deadline - now)
    }

    /// Number of timers that have not yet expired.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.lock().is_empty()
    }
}

impl std::fmt::Debug for GraceTimers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraceTimers")
            .field("active", &self.timers.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOB: RequesterId = RequesterId(2);

    #[tokio::test(start_paused = true)]
    async fn expires_after_duration() {
        let timers = Arc::new(GraceTimers::new());
        timers.arm(BOB, Duration::from_secs(10));
        assert!(timers.is_active(BOB));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(!timers.is_active(BOB));
        assert!(timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_instead_of_stacking() {
        let timers = Arc::new(GraceTimers::new());
        timers.arm(BOB, Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(8)).await;
        timers.arm(BOB, Duration::from_secs(10));
        assert_eq!(timers.len(), 1);

        // the first timer would have fired here
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(timers.is_active(BOB));
        assert_eq!(timers.remaining(BOB), Some(Duration::from_secs(6)));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(!timers.is_active(BOB));
    }
}
