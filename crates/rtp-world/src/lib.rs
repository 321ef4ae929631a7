//! World model for random relocation.
//!
//! Regions are searched chunk by chunk. A [`WorldProvider`] hands out
//! immutable [`Chunk`] snapshots asynchronously; safety checks then sample
//! them synchronously through [`WorldSampler`].
//!
//! Two providers ship with the crate:
//! - [`NoiseWorld`] - deterministic procedural terrain
//! - [`MemoryWorld`] - hand-authored columns, for exact scenarios

mod chunk;
mod material;
mod memory;
mod position;
mod provider;
mod terrain;

pub use chunk::{COLUMNS, Chunk, Column, SurfaceBlock, WorldSampler};
pub use material::{Biome, Material};
pub use memory::MemoryWorld;
pub use position::{
    BlockPos, CHUNK_SIZE, ChunkPos, Location, Position, Region, RegionId, VerticalRange,
};
pub use provider::{WorldError, WorldProvider, WorldResult};
pub use terrain::{NoiseWorld, TerrainConfig};
