//! Last-relocation timestamps per requester.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::request::RequesterId;

/// Entry count above which [`CooldownLedger::record`] sweeps expired entries.
pub const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
struct LedgerState {
    last: HashMap<RequesterId, Instant>,
    /// Entries older than this are swept. Never shrinks.
    horizon: Duration,
}

/// Requester to last successful relocation.
#[derive(Debug, Default)]
pub struct CooldownLedger {
    state: Mutex<LedgerState>,
}

impl CooldownLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger that keeps every entry younger than `horizon`, whatever
    /// cooldowns it has been asked about so far.
    #[must_use]
    pub fn with_horizon(horizon: Duration) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                last: HashMap::new(),
                horizon,
            }),
        }
    }

    #[must_use]
    pub fn horizon(&self) -> Duration {
        self.state.lock().horizon
    }

    /// Time left before `requester` may relocate again under `cooldown`.
    /// `None` when not on cooldown, including when there is no entry.
    pub fn remaining(&self, requester: RequesterId, cooldown: Duration) -> Option<Duration> {
        let mut state = self.state.lock();
        state.horizon = state.horizon.max(cooldown);
        let last = *state.last.get(&requester)?;
        let ready_at = last + cooldown;
        let now = Instant::now();
        (ready_at > now).then(|| ready_at - now)
    }

    /// Record a relocation at `at`. An older timestamp never replaces a newer one.
    pub fn record(&self, requester: RequesterId, at: Instant) {
        let mut state = self.state.lock();
        let entry = state.last.entry(requester).or_insert(at);
        *entry = (*entry).max(at);

        if state.last.len() > SWEEP_THRESHOLD {
            let horizon = state.horizon;
            let before = state.last.len();
            state
                .last
                .retain(|_, last| last.elapsed() < horizon);
            debug!(dropped = before - state.last.len(), "swept cooldown ledger");
        }
    }

    #[must_use]
    pub fn last(&self, requester: RequesterId) -> Option<Instant> {
        self.state.lock().last.get(&requester).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().last.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().last.is_empty()
    }
}
