//! Region id to queue mapping.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rtp_search::LocationSearcher;
use rtp_world::{Region, RegionId, WorldProvider};
use tracing::{debug, info};

use crate::observer::population_logger;
use crate::queue::{FillHandle, PrefetchQueue};

/// Result of activating a region.
#[derive(Debug)]
pub struct Activation<W> {
    pub queue: Arc<PrefetchQueue<W>>,
    /// Present only when this call created the queue.
    pub initial_fill: Option<FillHandle>,
}

/// Owns one [`PrefetchQueue`] per active region.
///
/// Regions are configured up front and activated once, either explicitly
/// (world load) or on first use. An active queue lives as long as the
/// registry.
pub struct RegionRegistry<W> {
    searcher: Arc<LocationSearcher<W>>,
    configured: RwLock<HashMap<RegionId, (Region, usize)>>,
    active: RwLock<HashMap<RegionId, Arc<PrefetchQueue<W>>>>,
    log_population: bool,
}

impl<W: WorldProvider> RegionRegistry<W> {
    #[must_use]
    pub fn new(searcher: Arc<LocationSearcher<W>>) -> Self {
        Self {
            searcher,
            configured: RwLock::new(HashMap::new()),
            active: RwLock::new(HashMap::new()),
            log_population: false,
        }
    }

    /// Subscribe [`population_logger`] to every queue created from now on.
    #[must_use]
    pub const fn with_population_logging(mut self, enabled: bool) -> Self {
        self.log_population = enabled;
        self
    }

    #[must_use]
    pub const fn searcher(&self) -> &Arc<LocationSearcher<W>> {
        &self.searcher
    }

    /// Declare a region and the capacity of its queue. Replacing the
    /// descriptor of an already active region has no effect on its queue.
    pub fn configure(&self, region: Region, capacity: usize) {
        debug!(region = %region.id, capacity, "configured region");
        self.configured
            .write()
            .insert(region.id.clone(), (region, capacity));
    }

    #[must_use]
    pub fn region(&self, id: &RegionId) -> Option<Region> {
        self.configured.read().get(id).map(|(region, _)| region.clone())
    }

    /// Ids of the regions whose queue exists.
    #[must_use]
    pub fn active(&self) -> Vec<RegionId> {
        let mut ids: Vec<_> = self.active.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn is_active(&self, id: &RegionId) -> bool {
        self.active.read().contains_key(id)
    }

    /// Create the region's queue and start filling it to capacity.
    ///
    /// Idempotent: a second call returns the existing queue with no fill.
    /// `None` if the region was never configured. Needs a tokio runtime.
    pub fn activate(&self, id: &RegionId) -> Option<Activation<W>> {
        let existing = self.active.read().get(id).cloned();
        if let Some(queue) = existing {
            return Some(Activation {
                queue,
                initial_fill: None,
            });
        }

        let (region, capacity) = self.configured.read().get(id).cloned()?;

        let queue = {
            let mut active = self.active.write();
            // lost a race with another activation
            if let Some(queue) = active.get(id) {
                return Some(Activation {
                    queue: queue.clone(),
                    initial_fill: None,
                });
            }
            let queue = Arc::new(PrefetchQueue::new(
                region,
                capacity,
                self.searcher.clone(),
            ));
            active.insert(id.clone(), queue.clone());
            queue
        };

        if self.log_population {
            queue.subscribe(population_logger());
        }
        info!(region = %id, capacity, "activated region");
        let initial_fill = queue.fill_to_capacity();

        Some(Activation {
            queue,
            initial_fill: Some(initial_fill),
        })
    }

    /// The region's queue, activating it if needed. The initial fill of a
    /// lazily activated region runs detached.
    pub fn queue(&self, id: &RegionId) -> Option<Arc<PrefetchQueue<W>>> {
        let activation = self.activate(id)?;
        if let Some(fill) = activation.initial_fill {
            fill.detach();
        }
        Some(activation.queue)
    }
}

impl<W> std::fmt::Debug for RegionRegistry<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionRegistry")
            .field("configured", &self.configured.read().len())
            .field("active", &self.active.read().len())
            .finish_non_exhaustive()
    }
}
