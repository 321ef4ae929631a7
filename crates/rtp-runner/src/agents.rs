//! Simulated agents and economy.

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::Rng as _;
use rtp_relocate::{Agent, CostError, CostProvider, RequesterId};
use rtp_world::{Location, RegionId};
use tracing::debug;

/// An agent that sometimes shuffles a few blocks.
pub struct Wanderer {
    id: RequesterId,
    location: Mutex<Location>,
    restless: f64,
}

impl Wanderer {
    /// `restless` is the chance of moving on each [`Wanderer::fidget`].
    pub fn new(id: u64, restless: f64) -> Self {
        Self {
            id: RequesterId(id),
            location: Mutex::new(Location::new(0.5, 64.0, 0.5)),
            restless,
        }
    }

    pub fn fidget(&self) {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.restless) {
            let mut location = self.location.lock();
            location.x += rng.gen_range(-1.0..=1.0);
            location.z += rng.gen_range(-1.0..=1.0);
        }
    }
}

impl Agent for Wanderer {
    fn id(&self) -> RequesterId {
        self.id
    }

    fn location(&self) -> Location {
        *self.location.lock()
    }

    fn teleport(&self, region: &RegionId, location: Location) {
        debug!(agent = %self.id, %region, ?location, "teleported");
        *self.location.lock() = location;
    }
}

/// Fixed starting balance per agent.
pub struct Bank {
    balances: Mutex<HashMap<RequesterId, f64>>,
    opening: f64,
}

impl Bank {
    pub fn new(opening: f64) -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            opening,
        }
    }

    pub fn balance(&self, requester: RequesterId) -> f64 {
        self.balances
            .lock()
            .get(&requester)
            .copied()
            .unwrap_or(self.opening)
    }
}

impl CostProvider for Bank {
    fn has_sufficient_balance(&self, requester: RequesterId, amount: f64) -> Result<bool, CostError> {
        Ok(self.balance(requester) >= amount)
    }

    fn settle(&self, requester: RequesterId, amount: f64) -> Result<(), CostError> {
        let mut balances = self.balances.lock();
        let balance = balances.entry(requester).or_insert(self.opening);
        if *balance < amount {
            return Err(CostError::Settlement {
                requester,
                amount,
                reason: format!("balance {balance:.2} too low"),
            });
        }
        *balance -= amount;
        Ok(())
    }
}
