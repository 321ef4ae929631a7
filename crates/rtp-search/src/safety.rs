//! The per-position safety predicate.

use rtp_world::{Position, WorldSampler};
use tracing::trace;

use crate::criteria::SafetyCriteria;

/// Offset above the surface block that must be air.
pub const HEADROOM: i32 = 2;

/// Whether an agent can be dropped on `position`.
///
/// Rules, first failure wins:
/// 1. the block [`HEADROOM`] above the surface is air
/// 2. the surface material is not disallowed
/// 3. every validator approves
///
/// Positions the sampler cannot see are unsafe.
pub fn is_safe(position: &Position, world: &impl WorldSampler, criteria: &SafetyCriteria) -> bool {
    let mut above = position.block();
    above.y += HEADROOM;
    match world.block_at(above) {
        Some(material) if material.is_air() => {}
        other => {
            trace!(%position, above = ?other, "rejected: no headroom");
            return false;
        }
    }

    let Some(surface) = world.block_at(position.block()) else {
        return false;
    };
    if criteria.is_material_disallowed(surface) {
        trace!(%position, %surface, "rejected: disallowed material");
        return false;
    }

    if let Some(validator) = criteria.validators().find(|v| !v.is_valid(position)) {
        trace!(%position, validator = validator.name(), "rejected by validator");
        return false;
    }

    trace!(%position, %surface, "safe");
    true
}
