//! Coordinates: regions, chunk positions, block positions and agent locations.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Side length of a chunk in blocks.
pub const CHUNK_SIZE: i32 = 16;

/// Identifier of a region (one per world).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(Arc<str>);

impl RegionId {
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Inclusive vertical bounds a surface must fall within.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerticalRange {
    pub min: i32,
    pub max: i32,
}

impl VerticalRange {
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub const fn contains(self, y: i32) -> bool {
        y >= self.min && y <= self.max
    }
}

/// Immutable description of a searchable area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub id: RegionId,
    /// Horizontal center, in blocks.
    pub center_x: i32,
    pub center_z: i32,
    /// Half-width of the search square, in blocks.
    pub radius: u32,
    pub vertical: Option<VerticalRange>,
}

impl Region {
    #[must_use]
    pub fn new(id: impl Into<RegionId>, center_x: i32, center_z: i32, radius: u32) -> Self {
        Self {
            id: id.into(),
            center_x,
            center_z,
            radius,
            vertical: None,
        }
    }

    #[must_use]
    pub fn with_vertical(mut self, range: VerticalRange) -> Self {
        self.vertical = Some(range);
        self
    }

    /// Chunk containing the region center.
    #[must_use]
    pub const fn center_chunk(&self) -> ChunkPos {
        BlockPos::new(self.center_x, 0, self.center_z).chunk()
    }

    /// Radius expressed in whole chunks.
    #[must_use]
    pub const fn chunk_radius(&self) -> i32 {
        (self.radius / CHUNK_SIZE as u32) as i32
    }
}

/// Chunk coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// World coordinates of the block at local `(lx, lz)`.
    #[must_use]
    pub const fn block_x(self, lx: i32) -> i32 {
        self.x * CHUNK_SIZE + lx
    }

    #[must_use]
    pub const fn block_z(self, lz: i32) -> i32 {
        self.z * CHUNK_SIZE + lz
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk({}, {})", self.x, self.z)
    }
}

/// Integer block coordinates, without a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos {
            x: self.x.div_euclid(CHUNK_SIZE),
            z: self.z.div_euclid(CHUNK_SIZE),
        }
    }

    /// Local column inside the containing chunk.
    #[must_use]
    pub const fn local(self) -> (usize, usize) {
        (
            self.x.rem_euclid(CHUNK_SIZE) as usize,
            self.z.rem_euclid(CHUNK_SIZE) as usize,
        )
    }
}

/// A surface block inside a region. Produced by the searcher, consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub region: RegionId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    #[must_use]
    pub const fn new(region: RegionId, x: i32, y: i32, z: i32) -> Self {
        Self { region, x, y, z }
    }

    #[must_use]
    pub const fn block(&self) -> BlockPos {
        BlockPos::new(self.x, self.y, self.z)
    }

    #[must_use]
    pub const fn chunk(&self) -> ChunkPos {
        self.block().chunk()
    }

    /// Where an agent ends up when moved onto this surface block.
    #[must_use]
    pub fn standing_location(&self) -> Location {
        Location::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 1.5,
            f64::from(self.z) + 0.5,
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {}, {})", self.region, self.x, self.y, self.z)
    }
}

/// Continuous agent location.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
