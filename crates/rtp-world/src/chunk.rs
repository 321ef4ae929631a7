//! Loaded chunk snapshots and the sampling interface safety checks read from.

use smallvec::SmallVec;

use crate::material::{Biome, Material};
use crate::position::{BlockPos, CHUNK_SIZE, ChunkPos};

/// Number of columns in a chunk.
pub const COLUMNS: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// Topmost surface block of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceBlock {
    pub y: i32,
    pub material: Material,
    pub biome: Biome,
}

/// One vertical column of a chunk.
///
/// Only the heightmap surface and whatever non-surface blocks sit above it
/// (leaves, fire, ...) are kept. Everything below the surface reads as stone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub surface_y: i32,
    pub surface: Material,
    pub biome: Biome,
    pub overhang: SmallVec<[(i32, Material); 2]>,
}

impl Column {
    #[must_use]
    pub fn new(surface_y: i32, surface: Material, biome: Biome) -> Self {
        Self {
            surface_y,
            surface,
            biome,
            overhang: SmallVec::new(),
        }
    }

    /// Place a block above the surface.
    #[must_use]
    pub fn with_block_above(mut self, y: i32, material: Material) -> Self {
        debug_assert!(y > self.surface_y, "overhang must be above the surface");
        self.overhang.retain(|(oy, _)| *oy != y);
        self.overhang.push((y, material));
        self
    }

    #[must_use]
    pub fn block_at(&self, y: i32) -> Material {
        if y == self.surface_y {
            return self.surface;
        }
        if y < self.surface_y {
            return Material::Stone;
        }
        self.overhang
            .iter()
            .find(|(oy, _)| *oy == y)
            .map_or(Material::Air, |(_, material)| *material)
    }
}

/// Read access to terrain around a candidate position.
pub trait WorldSampler {
    fn highest_surface_at(&self, x: i32, z: i32) -> Option<SurfaceBlock>;

    fn block_at(&self, pos: BlockPos) -> Option<Material>;

    fn biome_at(&self, x: i32, z: i32) -> Option<Biome> {
        self.highest_surface_at(x, z).map(|surface| surface.biome)
    }
}

/// Immutable snapshot of a loaded chunk.
#[derive(Debug, Clone)]
pub struct Chunk {
    pos: ChunkPos,
    columns: Vec<Column>,
}

impl Chunk {
    /// Build a chunk from a per-column generator taking local `(lx, lz)`.
    pub fn generate(pos: ChunkPos, mut column: impl FnMut(i32, i32) -> Column) -> Self {
        let mut columns = Vec::with_capacity(COLUMNS);
        for lz in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                columns.push(column(lx, lz));
            }
        }
        Self { pos, columns }
    }

    #[must_use]
    pub const fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Column at local coordinates.
    #[must_use]
    pub fn column(&self, lx: usize, lz: usize) -> &Column {
        &self.columns[lz * CHUNK_SIZE as usize + lx]
    }

    /// Iterate all columns with their local coordinates.
    pub fn columns(&self) -> impl Iterator<Item = ((usize, usize), &Column)> {
        self.columns.iter().enumerate().map(|(i, column)| {
            let size = CHUNK_SIZE as usize;
            ((i % size, i / size), column)
        })
    }

    fn column_at(&self, x: i32, z: i32) -> Option<&Column> {
        let block = BlockPos::new(x, 0, z);
        if block.chunk() != self.pos {
            return None;
        }
        let (lx, lz) = block.local();
        Some(self.column(lx, lz))
    }
}

impl WorldSampler for Chunk {
    fn highest_surface_at(&self, x: i32, z: i32) -> Option<SurfaceBlock> {
        self.column_at(x, z).map(|column| SurfaceBlock {
            y: column.surface_y,
            material: column.surface,
            biome: column.biome,
        })
    }

    fn block_at(&self, pos: BlockPos) -> Option<Material> {
        self.column_at(pos.x, pos.z).map(|column| column.block_at(pos.y))
    }
}
