//! What a relocation asks for and who asks.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use rtp_world::{Location, RegionId};

/// Stable identity of an agent, used as the cooldown and grace key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequesterId(pub u64);

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Something that can be relocated.
pub trait Agent: Send + Sync + 'static {
    fn id(&self) -> RequesterId;

    /// Current location, polled while a delayed relocation is pending.
    fn location(&self) -> Location;

    fn teleport(&self, region: &RegionId, location: Location);
}

bitflags! {
    /// Privileges that skip parts of the relocation sequence.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RelocationFlags: u8 {
        const IGNORE_DELAY = 1 << 0;
        const IGNORE_COOLDOWN = 1 << 1;
        const USES_COST = 1 << 2;
    }
}

/// Per-kind timing and price of a relocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelocationSettings {
    pub cooldown: Duration,
    /// Wait before moving. Zero moves immediately.
    pub delay: Duration,
    pub cancel_on_move: bool,
    /// Protective window armed after a successful move.
    pub grace: Option<Duration>,
    /// Charged only when [`RelocationFlags::USES_COST`] is set.
    pub price: f64,
}

impl Default for RelocationSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::ZERO,
            delay: Duration::ZERO,
            cancel_on_move: false,
            grace: None,
            price: 0.0,
        }
    }
}

/// One relocation request. Built per invocation and consumed by
/// [`RelocationScheduler::request_relocation`](crate::RelocationScheduler::request_relocation).
#[derive(Clone)]
pub struct RelocationRequest {
    pub agent: Arc<dyn Agent>,
    pub region: RegionId,
    pub flags: RelocationFlags,
    pub settings: RelocationSettings,
}

impl RelocationRequest {
    pub fn new(agent: Arc<dyn Agent>, region: impl Into<RegionId>) -> Self {
        Self {
            agent,
            region: region.into(),
            flags: RelocationFlags::empty(),
            settings: RelocationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RelocationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_flags(mut self, flags: RelocationFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.settings.cooldown = cooldown;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.settings.delay = delay;
        self
    }

    pub fn cancel_on_move(mut self, cancel: bool) -> Self {
        self.settings.cancel_on_move = cancel;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.settings.grace = Some(grace);
        self
    }

    /// Charge `price` for the relocation.
    pub fn with_cost(mut self, price: f64) -> Self {
        self.settings.price = price;
        self.flags |= RelocationFlags::USES_COST;
        self
    }

    pub fn requester(&self) -> RequesterId {
        self.agent.id()
    }

    pub(crate) fn uses_cost(&self) -> bool {
        self.flags.contains(RelocationFlags::USES_COST)
    }

    pub(crate) fn checks_cooldown(&self) -> bool {
        !self.flags.contains(RelocationFlags::IGNORE_COOLDOWN) && !self.settings.cooldown.is_zero()
    }

    /// The pre-move delay after privileges, `None` when moving immediately.
    pub(crate) fn effective_delay(&self) -> Option<Duration> {
        if self.flags.contains(RelocationFlags::IGNORE_DELAY) || self.settings.delay.is_zero() {
            None
        } else {
            Some(self.settings.delay)
        }
    }
}

impl fmt::Debug for RelocationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelocationRequest")
            .field("requester", &self.requester())
            .field("region", &self.region)
            .field("flags", &self.flags)
            .field("settings", &self.settings)
            .finish()
    }
}
