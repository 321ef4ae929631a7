//! Notices delivered to the requester.

use std::fmt;
use std::time::Duration;

use rtp_world::Position;

use crate::request::RequesterId;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    InsufficientFunds { price: f64 },
    /// Still on cooldown.
    Countdown { remaining: Duration },
    /// A delayed relocation has started.
    Delay { delay: Duration },
    Canceled,
    /// The queue was empty and the direct search found nothing either.
    Depleted,
    Teleported { position: Position },
    Payment { price: f64 },
    /// No safe position could be found.
    Failed,
}

fn seconds(duration: Duration) -> u64 {
    // rounded up: a pending wait never reads as 0 seconds
    duration.as_millis().div_ceil(1000) as u64
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFunds { price } => {
                write!(f, "You need {price:.2} to use random teleport")
            }
            Self::Countdown { remaining } => write!(
                f,
                "You need to wait {} seconds before teleporting again",
                seconds(*remaining)
            ),
            Self::Delay { delay } => {
                write!(f, "Teleporting in {} seconds, don't move", seconds(*delay))
            }
            Self::Canceled => f.write_str("Teleport canceled because you moved"),
            Self::Depleted => f.write_str("No safe locations are ready right now"),
            Self::Teleported { position } => write!(
                f,
                "Teleported to {}, {}, {}",
                position.x, position.y, position.z
            ),
            Self::Payment { price } => write!(f, "Charged {price:.2} for teleporting"),
            Self::Failed => f.write_str("Could not find a safe location, try again later"),
        }
    }
}

/// One-way delivery of notices to requesters.
pub trait MessageSink: Send + Sync + 'static {
    fn send(&self, requester: RequesterId, message: &Message);
}

impl<F> MessageSink for F
where
    F: Fn(RequesterId, &Message) + Send + Sync + 'static,
{
    fn send(&self, requester: RequesterId, message: &Message) {
        self(requester, message);
    }
}

/// Sink logging every notice through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn send(&self, requester: RequesterId, message: &Message) {
        tracing::info!(%requester, "{message}");
    }
}
