//! Procedural terrain - noise heightmap with oceans, deserts and forests

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::chunk::{Chunk, Column};
use crate::material::{Biome, Material};
use crate::position::{ChunkPos, RegionId};
use crate::provider::{WorldProvider, WorldResult};

// ============================================================================
// Noise
// ============================================================================

/// Simple permutation table for noise
const PERM: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

fn hash(x: i32) -> u8 {
    PERM[(x & 255) as usize]
}

fn hash2(x: i32, y: i32) -> u8 {
    hash(x.wrapping_add(i32::from(hash(y))))
}

fn grad2(hash: u8, x: f64, y: f64) -> f64 {
    match hash & 7 {
        0 => x + y,
        1 => y + x,
        2 => -x + y,
        3 => -y + x,
        4 => x - y,
        5 => y - x,
        6 => -x - y,
        _ => -y - x,
    }
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// 2D Perlin noise, roughly in [-1, 1]
fn noise2d(x: f64, y: f64) -> f64 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;

    let dx = x - f64::from(x0);
    let dy = y - f64::from(y0);
    let sx = fade(dx);
    let sy = fade(dy);

    let n00 = grad2(hash2(x0, y0), dx, dy);
    let n10 = grad2(hash2(x0 + 1, y0), dx - 1.0, dy);
    let n01 = grad2(hash2(x0, y0 + 1), dx, dy - 1.0);
    let n11 = grad2(hash2(x0 + 1, y0 + 1), dx - 1.0, dy - 1.0);

    lerp(lerp(n00, n10, sx), lerp(n01, n11, sx), sy)
}

/// Fractal Brownian Motion - multiple octaves of noise
fn fbm(x: f64, y: f64, octaves: u32) -> f64 {
    let mut value = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        value += noise2d(x * frequency, y * frequency) * amplitude;
        max_value += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }

    value / max_value
}

/// Stable per-column hash in [0, 1), for scattering features.
fn scatter(seed: u64, x: i32, z: i32) -> f64 {
    let mut h = seed ^ (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= (z as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    (h >> 11) as f64 / (1u64 << 53) as f64
}

// ============================================================================
// Terrain
// ============================================================================

/// Tuning for generated terrain.
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    pub seed: u64,
    pub sea_level: i32,
    pub base_height: i32,
    pub relief: i32,
    /// Horizontal scale of continents; smaller means larger landmasses.
    pub continent_scale: f64,
    pub climate_scale: f64,
    /// Chance that a desert column is a cactus.
    pub cactus_density: f64,
    /// Chance that a forest column sits under a canopy.
    pub canopy_density: f64,
    /// Chance that a land column is a lava pool.
    pub lava_density: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            sea_level: 62,
            base_height: 60,
            relief: 28,
            continent_scale: 0.004,
            climate_scale: 0.002,
            cactus_density: 0.03,
            canopy_density: 0.35,
            lava_density: 0.002,
        }
    }
}

impl TerrainConfig {
    fn offset(&self) -> (f64, f64) {
        let ox = (self.seed & 0xFFFF) as f64 * 31.7;
        let oz = ((self.seed >> 16) & 0xFFFF) as f64 * 17.3;
        (ox, oz)
    }

    fn surface_height(&self, x: i32, z: i32) -> i32 {
        let (ox, oz) = self.offset();
        let sx = f64::from(x) * self.continent_scale + ox;
        let sz = f64::from(z) * self.continent_scale + oz;

        let continents = fbm(sx, sz, 4);
        let detail = noise2d(sx * 8.0, sz * 8.0) * 0.1;
        let normalized = (continents + detail + 0.5).clamp(0.0, 1.0);
        self.base_height - self.relief / 2 + (normalized * f64::from(self.relief)) as i32
    }

    fn temperature(&self, x: i32, z: i32) -> f64 {
        let (ox, oz) = self.offset();
        fbm(
            f64::from(x) * self.climate_scale - oz,
            f64::from(z) * self.climate_scale + ox,
            2,
        )
    }

    fn column(&self, x: i32, z: i32) -> Column {
        let height = self.surface_height(x, z);
        let temperature = self.temperature(x, z);

        if height < self.sea_level {
            let depth = self.sea_level - height;
            let biome = match (depth > 12, temperature) {
                (true, _) => Biome::DeepOcean,
                (false, t) if t > 0.25 => Biome::WarmOcean,
                (false, t) if t < -0.25 => Biome::FrozenOcean,
                _ => Biome::Ocean,
            };
            let surface = if biome == Biome::FrozenOcean {
                Material::Ice
            } else {
                Material::Water
            };
            return Column::new(self.sea_level, surface, biome);
        }

        if height == self.sea_level {
            return Column::new(height, Material::Sand, Biome::Beach);
        }

        let roll = scatter(self.seed, x, z);
        if roll < self.lava_density {
            return Column::new(height, Material::Lava, biome_for(temperature));
        }

        match biome_for(temperature) {
            Biome::Desert if roll < self.cactus_density => {
                Column::new(height, Material::Cactus, Biome::Desert)
            }
            Biome::Desert => Column::new(height, Material::Sand, Biome::Desert),
            Biome::Forest if roll < self.canopy_density => {
                Column::new(height, Material::GrassBlock, Biome::Forest)
                    .with_block_above(height + 2, Material::Leaves)
                    .with_block_above(height + 3, Material::Leaves)
            }
            Biome::SnowyPlains => Column::new(height, Material::Snow, Biome::SnowyPlains),
            biome => Column::new(height, Material::GrassBlock, biome),
        }
    }
}

fn biome_for(temperature: f64) -> Biome {
    if temperature > 0.3 {
        Biome::Desert
    } else if temperature > 0.05 {
        Biome::Plains
    } else if temperature > -0.3 {
        Biome::Forest
    } else {
        Biome::SnowyPlains
    }
}

/// Deterministic generated world. Every region uses the same terrain.
pub struct NoiseWorld {
    config: TerrainConfig,
    latency: Duration,
}

impl NoiseWorld {
    #[must_use]
    pub fn new(config: TerrainConfig) -> Self {
        Self {
            config,
            latency: Duration::ZERO,
        }
    }

    /// Simulate generation/IO cost per chunk load.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Generate a chunk synchronously.
    #[must_use]
    pub fn generate(&self, pos: ChunkPos) -> Chunk {
        Chunk::generate(pos, |lx, lz| {
            self.config.column(pos.block_x(lx), pos.block_z(lz))
        })
    }
}

impl WorldProvider for NoiseWorld {
    async fn load_chunk(&self, region: &RegionId, pos: ChunkPos) -> WorldResult<Arc<Chunk>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        trace!(%region, %pos, "generating chunk");
        Ok(Arc::new(self.generate(pos)))
    }
}
