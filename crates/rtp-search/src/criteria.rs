//! What makes a position acceptable.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rtp_world::{Biome, Material, Position, RegionId};

/// Pluggable position check, e.g. a land-claim or protection plugin.
///
/// Validators are called from concurrent searches and must not mutate shared
/// state.
pub trait PositionValidator: Send + Sync + 'static {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    fn is_valid(&self, position: &Position) -> bool;
}

/// Disallowed materials and biomes, plus an ordered list of validators.
///
/// Treated as read-only once built; replace the whole value to change it.
#[derive(Clone, Default)]
pub struct SafetyCriteria {
    materials: HashSet<Material>,
    biomes: HashSet<Biome>,
    validators: Vec<Arc<dyn PositionValidator>>,
}

impl SafetyCriteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hazard materials and every ocean biome.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .disallow_materials(Material::HAZARDS)
            .disallow_biomes(Biome::oceans())
    }

    #[must_use]
    pub fn disallow_materials(mut self, materials: impl IntoIterator<Item = Material>) -> Self {
        self.materials.extend(materials);
        self
    }

    #[must_use]
    pub fn disallow_biomes(mut self, biomes: impl IntoIterator<Item = Biome>) -> Self {
        self.biomes.extend(biomes);
        self
    }

    /// Append a validator. Validators run in registration order.
    #[must_use]
    pub fn with_validator(mut self, validator: impl PositionValidator) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn is_material_disallowed(&self, material: Material) -> bool {
        self.materials.contains(&material)
    }

    #[must_use]
    pub fn is_biome_disallowed(&self, biome: Biome) -> bool {
        self.biomes.contains(&biome)
    }

    pub fn validators(&self) -> impl Iterator<Item = &dyn PositionValidator> {
        self.validators.iter().map(|validator| &**validator)
    }
}

impl fmt::Debug for SafetyCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafetyCriteria")
            .field("materials", &self.materials)
            .field("biomes", &self.biomes)
            .field(
                "validators",
                &self.validators.iter().map(|v| v.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Axis-aligned rectangle, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl Area {
    /// Build from two corners in any order.
    #[must_use]
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        Self {
            min_x: a.0.min(b.0),
            min_z: a.1.min(b.1),
            max_x: a.0.max(b.0),
            max_z: a.1.max(b.1),
        }
    }

    #[must_use]
    pub const fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}

/// Rejects positions inside protected areas of a region.
#[derive(Debug, Clone)]
pub struct ExclusionZone {
    name: String,
    region: RegionId,
    areas: Vec<Area>,
}

impl ExclusionZone {
    #[must_use]
    pub fn new(name: impl Into<String>, region: RegionId) -> Self {
        Self {
            name: name.into(),
            region,
            areas: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_area(mut self, area: Area) -> Self {
        self.areas.push(area);
        self
    }
}

impl PositionValidator for ExclusionZone {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self, position: &Position) -> bool {
        position.region != self.region
            || !self
                .areas
                .iter()
                .any(|area| area.contains(position.x, position.z))
    }
}
