//! Relocation requests and the state machine that serves them.
//!
//! ```text
//! Idle → CostCheck → CooldownCheck → DelayWait | Immediate → Executing → PostProcess → Done
//!            ↘ Rejected     ↘ Rejected      ↘ Canceled
//! ```
//!
//! [`RelocationScheduler::request_relocation`] is the single entry point.
//! Collaborators are injected: a [`CostProvider`] (optional), a
//! [`MessageSink`], and the [`rtp_queue::RegionRegistry`] supplying
//! positions.

mod cooldown;
mod cost;
mod grace;
mod message;
mod request;
mod scheduler;

pub use cooldown::{CooldownLedger, SWEEP_THRESHOLD};
pub use cost::{CostError, CostProvider};
pub use grace::GraceTimers;
pub use message::{LogSink, Message, MessageSink};
pub use request::{Agent, RelocationFlags, RelocationRequest, RelocationSettings, RequesterId};
pub use scheduler::{
    DEFAULT_POLL_INTERVAL, Phase, Relocation, RelocationError, RelocationScheduler,
    SchedulerOptions, Source,
};
