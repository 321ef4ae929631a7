//! Config file sections.

use rtp_search::DEFAULT_MAX_ATTEMPTS;
use rtp_world::{Biome, Material, RegionId, VerticalRange};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    pub id: RegionId,
    #[serde(default)]
    pub center_x: i32,
    #[serde(default)]
    pub center_z: i32,
    /// Signed so a negative value is reported instead of failing to parse.
    pub radius: i64,
    #[serde(default)]
    pub vertical: Option<VerticalRange>,
    /// Overrides `queue.size` for this region.
    #[serde(default)]
    pub queue_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub size: usize,
    /// Wait before refilling a slot emptied by a relocation.
    pub refill_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            size: 5,
            refill_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TeleportConfig {
    pub cooldown_ms: u64,
    pub delay_ms: u64,
    pub cancel_on_move: bool,
    /// Zero disables the grace window.
    pub grace_ms: u64,
}

/// Partial override of [`TeleportConfig`] and the price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KindConfig {
    pub cooldown_ms: Option<u64>,
    pub delay_ms: Option<u64>,
    pub cancel_on_move: Option<bool>,
    pub grace_ms: Option<u64>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EconomyConfig {
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlacklistConfig {
    pub materials: Vec<Material>,
    pub biomes: Vec<Biome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// `null` searches without limit.
    pub max_attempts: Option<u32>,
    /// Queued positions older than this are checked again before use.
    pub revalidate_after_ms: u64,
    /// Movement check interval during a cancellable delay.
    pub poll_interval_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            revalidate_after_ms: 0,
            poll_interval_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaConfig {
    pub from: (i32, i32),
    pub to: (i32, i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExclusionConfig {
    pub name: String,
    pub region: RegionId,
    pub areas: Vec<AreaConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebugConfig {
    /// Log every queue add and remove.
    pub show_queue_population: bool,
}
