//! Rejection-sampling search for a safe position inside a region.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use rtp_world::{
    Biome, CHUNK_SIZE, Chunk, ChunkPos, Position, Region, RegionId, WorldProvider, WorldSampler,
};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::criteria::SafetyCriteria;
use crate::safety::is_safe;

/// Interior sub-grid scanned in each admitted chunk, local coordinates
/// `SCAN_MIN..SCAN_MAX` on both axes.
pub const SCAN_MIN: i32 = 4;
pub const SCAN_MAX: i32 = 12;

/// Default ceiling on chunk attempts per search.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Search error type.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Every attempted chunk was rejected.
    #[error("no safe position in {region} after {attempts} chunk attempts")]
    NonConvergent { region: RegionId, attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// `None` searches forever, which never returns for a region with no
    /// reachable safe area.
    pub max_attempts: Option<u32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
        }
    }
}

/// Finds safe positions by sampling random chunks of a region.
///
/// One attempt:
/// 1. pick a chunk uniformly inside the region's chunk square
/// 2. load it (suspends) and reject it if any column is a disallowed biome
/// 3. scan the interior sub-grid, returning the first safe surface
///
/// Any rejection starts a fresh attempt. Searches share nothing mutable but
/// the RNG, so any number may run concurrently.
pub struct LocationSearcher<W> {
    world: Arc<W>,
    criteria: RwLock<Arc<SafetyCriteria>>,
    options: SearchOptions,
    rng: Mutex<StdRng>,
}

impl<W: WorldProvider> LocationSearcher<W> {
    #[must_use]
    pub fn new(world: Arc<W>, criteria: SafetyCriteria) -> Self {
        Self {
            world,
            criteria: RwLock::new(Arc::new(criteria)),
            options: SearchOptions::default(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Make chunk selection reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    #[must_use]
    pub fn world(&self) -> &Arc<W> {
        &self.world
    }

    #[must_use]
    pub const fn options(&self) -> SearchOptions {
        self.options
    }

    /// Snapshot of the current criteria.
    #[must_use]
    pub fn criteria(&self) -> Arc<SafetyCriteria> {
        self.criteria.read().clone()
    }

    /// Swap in new criteria. Searches already running keep their snapshot.
    pub fn replace_criteria(&self, criteria: SafetyCriteria) {
        debug!(?criteria, "replacing safety criteria");
        *self.criteria.write() = Arc::new(criteria);
    }

    /// Re-check a position against the current criteria.
    pub fn is_safe(&self, position: &Position, world: &impl WorldSampler) -> bool {
        is_safe(position, world, &self.criteria())
    }

    /// Find one safe position in `region`.
    pub async fn find(&self, region: &Region) -> Result<Position, SearchError> {
        let criteria = self.criteria();
        let mut attempts: u32 = 0;

        loop {
            if self.options.max_attempts.is_some_and(|max| attempts >= max) {
                warn!(region = %region.id, attempts, "search did not converge");
                return Err(SearchError::NonConvergent {
                    region: region.id.clone(),
                    attempts,
                });
            }
            attempts += 1;

            let pos = self.pick_chunk(region);
            match self.world.load_chunk(&region.id, pos).await {
                Ok(chunk) => {
                    if let Some(position) = try_chunk(region, &chunk, &criteria) {
                        debug!(%position, attempts, "found safe position");
                        return Ok(position);
                    }
                }
                Err(err) => {
                    warn!(region = %region.id, %pos, %err, "chunk load failed");
                }
            }

            // a provider that resolves immediately must not starve the executor
            tokio::task::yield_now().await;
        }
    }

    fn pick_chunk(&self, region: &Region) -> ChunkPos {
        let radius = region.chunk_radius();
        let mut rng = self.rng.lock();
        let dx = rng.gen_range(-radius..=radius);
        let dz = rng.gen_range(-radius..=radius);
        region.center_chunk().offset(dx, dz)
    }
}

fn try_chunk(region: &Region, chunk: &Chunk, criteria: &SafetyCriteria) -> Option<Position> {
    if let Some(biome) = disallowed_biome(chunk, criteria) {
        trace!(pos = %chunk.pos(), %biome, "chunk rejected");
        return None;
    }
    let found = scan_chunk(region, chunk, criteria);
    if found.is_none() {
        trace!(pos = %chunk.pos(), "no safe column in chunk");
    }
    found
}

/// First disallowed biome among the chunk's columns.
fn disallowed_biome(chunk: &Chunk, criteria: &SafetyCriteria) -> Option<Biome> {
    let pos = chunk.pos();
    (0..CHUNK_SIZE)
        .flat_map(|lz| (0..CHUNK_SIZE).map(move |lx| (pos.block_x(lx), pos.block_z(lz))))
        .filter_map(|(x, z)| chunk.biome_at(x, z))
        .find(|biome| criteria.is_biome_disallowed(*biome))
}

/// First safe surface in the interior sub-grid.
fn scan_chunk(region: &Region, chunk: &Chunk, criteria: &SafetyCriteria) -> Option<Position> {
    let pos = chunk.pos();
    for lx in SCAN_MIN..SCAN_MAX {
        for lz in SCAN_MIN..SCAN_MAX {
            let x = pos.block_x(lx);
            let z = pos.block_z(lz);
            let Some(surface) = chunk.highest_surface_at(x, z) else {
                continue;
            };
            if region.vertical.is_some_and(|range| !range.contains(surface.y)) {
                continue;
            }
            let candidate = Position::new(region.id.clone(), x, surface.y, z);
            if is_safe(&candidate, chunk, criteria) {
                return Some(candidate);
            }
        }
    }
    None
}
