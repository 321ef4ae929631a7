//! Asynchronous access to world data.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use crate::chunk::Chunk;
use crate::position::{ChunkPos, RegionId};

/// World data error type.
#[derive(Debug, Error)]
pub enum WorldError {
    /// The region is not loaded by the provider.
    #[error("unknown region: {0}")]
    UnknownRegion(RegionId),

    /// The chunk could not be produced.
    #[error("chunk {pos} in {region} unavailable: {reason}")]
    ChunkUnavailable {
        region: RegionId,
        pos: ChunkPos,
        reason: String,
    },
}

/// Result type for world data lookups.
pub type WorldResult<T> = Result<T, WorldError>;

/// Source of chunk snapshots.
///
/// Loading may involve I/O or generation, so it is a suspension point; the
/// returned snapshot is then sampled synchronously.
pub trait WorldProvider: Send + Sync + 'static {
    fn load_chunk(
        &self,
        region: &RegionId,
        pos: ChunkPos,
    ) -> impl Future<Output = WorldResult<Arc<Chunk>>> + Send;
}

impl<W: WorldProvider> WorldProvider for Arc<W> {
    fn load_chunk(
        &self,
        region: &RegionId,
        pos: ChunkPos,
    ) -> impl Future<Output = WorldResult<Arc<Chunk>>> + Send {
        (**self).load_chunk(region, pos)
    }
}
