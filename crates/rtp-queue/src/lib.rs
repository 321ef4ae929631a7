//! Per-region prefetch queues.
//!
//! A [`PrefetchQueue`] keeps up to `capacity` safe positions ready so a
//! relocation rarely waits on a search. [`RegionRegistry`] creates one queue
//! per region when the region becomes active.

mod observer;
mod queue;
mod registry;

pub use observer::{ObserverId, QueueEvent, QueueEventKind, QueueObserver, population_logger};
pub use queue::{Candidate, FillHandle, FillReport, PrefetchQueue};
pub use registry::{Activation, RegionRegistry};
