//! Block materials and biomes, as far as relocation cares about them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Surface material of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Air,
    CaveAir,
    Bedrock,
    Stone,
    Dirt,
    GrassBlock,
    Sand,
    Sandstone,
    Gravel,
    Snow,
    Ice,
    Water,
    Lava,
    Fire,
    Magma,
    Cactus,
    Leaves,
    Log,
    Tripwire,
    OakPressurePlate,
    SprucePressurePlate,
    BirchPressurePlate,
    JunglePressurePlate,
    AcaciaPressurePlate,
    DarkOakPressurePlate,
    StonePressurePlate,
    LightWeightedPressurePlate,
    HeavyWeightedPressurePlate,
}

impl Material {
    /// Materials nobody should be dropped onto.
    pub const HAZARDS: [Self; 13] = [
        Self::Lava,
        Self::Cactus,
        Self::Fire,
        Self::Tripwire,
        Self::AcaciaPressurePlate,
        Self::BirchPressurePlate,
        Self::JunglePressurePlate,
        Self::OakPressurePlate,
        Self::SprucePressurePlate,
        Self::StonePressurePlate,
        Self::DarkOakPressurePlate,
        Self::HeavyWeightedPressurePlate,
        Self::LightWeightedPressurePlate,
    ];

    /// Open space an agent's head can occupy.
    #[must_use]
    pub const fn is_air(self) -> bool {
        matches!(self, Self::Air | Self::CaveAir)
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Terrain biome sampled at a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    Plains,
    Desert,
    Forest,
    Taiga,
    Swamp,
    Beach,
    River,
    Mountains,
    SnowyPlains,
    Ocean,
    DeepOcean,
    WarmOcean,
    LukewarmOcean,
    ColdOcean,
    FrozenOcean,
}

impl Biome {
    pub const ALL: [Self; 15] = [
        Self::Plains,
        Self::Desert,
        Self::Forest,
        Self::Taiga,
        Self::Swamp,
        Self::Beach,
        Self::River,
        Self::Mountains,
        Self::SnowyPlains,
        Self::Ocean,
        Self::DeepOcean,
        Self::WarmOcean,
        Self::LukewarmOcean,
        Self::ColdOcean,
        Self::FrozenOcean,
    ];

    #[must_use]
    pub const fn is_ocean(self) -> bool {
        matches!(
            self,
            Self::Ocean
                | Self::DeepOcean
                | Self::WarmOcean
                | Self::LukewarmOcean
                | Self::ColdOcean
                | Self::FrozenOcean
        )
    }

    /// Every ocean variant.
    pub fn oceans() -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(|biome| biome.is_ocean())
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
