//! Hand-authored in-memory world, for tests and fixtures.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use crate::chunk::{Chunk, Column};
use crate::position::{BlockPos, ChunkPos, RegionId};
use crate::provider::{WorldError, WorldProvider, WorldResult};

struct MemoryRegion {
    fallback: Column,
    chunks: HashMap<ChunkPos, Column>,
    columns: HashMap<(i32, i32), Column>,
}

impl MemoryRegion {
    fn column(&self, x: i32, z: i32) -> Column {
        if let Some(column) = self.columns.get(&(x, z)) {
            return column.clone();
        }
        let chunk = BlockPos::new(x, 0, z).chunk();
        self.chunks
            .get(&chunk)
            .unwrap_or(&self.fallback)
            .clone()
    }
}

/// World whose terrain is set column by column.
///
/// Columns resolve in order: explicit column, whole-chunk fill, region fallback.
/// Terrain may be edited at any time; edits show up on the next chunk load.
#[derive(Default)]
pub struct MemoryWorld {
    regions: RwLock<HashMap<RegionId, MemoryRegion>>,
    latency: Duration,
    loads: AtomicUsize,
}

impl MemoryWorld {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every chunk load by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Add (or reset) a region where every column is `fallback`.
    pub fn add_region(&self, region: impl Into<RegionId>, fallback: Column) {
        self.regions.write().insert(
            region.into(),
            MemoryRegion {
                fallback,
                chunks: HashMap::new(),
                columns: HashMap::new(),
            },
        );
    }

    /// Fill every column of `pos` with `column`.
    pub fn fill_chunk(&self, region: &RegionId, pos: ChunkPos, column: Column) {
        if let Some(data) = self.regions.write().get_mut(region) {
            data.chunks.insert(pos, column);
        }
    }

    pub fn set_column(&self, region: &RegionId, x: i32, z: i32, column: Column) {
        if let Some(data) = self.regions.write().get_mut(region) {
            data.columns.insert((x, z), column);
        }
    }

    /// Number of chunk loads served so far.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn snapshot(&self, region: &RegionId, pos: ChunkPos) -> WorldResult<Arc<Chunk>> {
        let regions = self.regions.read();
        let data = regions
            .get(region)
            .ok_or_else(|| WorldError::UnknownRegion(region.clone()))?;
        Ok(Arc::new(Chunk::generate(pos, |lx, lz| {
            data.column(pos.block_x(lx), pos.block_z(lz))
        })))
    }
}

impl WorldProvider for MemoryWorld {
    async fn load_chunk(&self, region: &RegionId, pos: ChunkPos) -> WorldResult<Arc<Chunk>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.snapshot(region, pos)
    }
}
