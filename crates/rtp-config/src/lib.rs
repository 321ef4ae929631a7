//! JSON configuration.
//!
//! Every section is optional and falls back to defaults. After parsing,
//! [`Config::validate`] rejects values the engine cannot run with, and the
//! conversion methods build the engine's own types.
//!
//! ```json
//! {
//!   "regions": [{ "id": "overworld", "radius": 5000 }],
//!   "queue": { "size": 5 },
//!   "teleport": { "cooldown_ms": 60000, "delay_ms": 3000, "cancel_on_move": true },
//!   "blacklist": { "materials": ["lava", "cactus"], "biomes": ["ocean"] }
//! }
//! ```

mod error;
mod sections;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use rtp_relocate::{RelocationSettings, SchedulerOptions};
use rtp_search::{Area, ExclusionZone, SafetyCriteria, SearchOptions};
use rtp_world::{CHUNK_SIZE, Region};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use error::{ConfigError, ConfigResult};
pub use sections::{
    AreaConfig, BlacklistConfig, DebugConfig, EconomyConfig, ExclusionConfig, KindConfig,
    QueueConfig, RegionConfig, SearchConfig, TeleportConfig,
};

/// Largest `|center| + radius` on either axis. Two chunks short of `i32::MAX`
/// so every block coordinate of the outermost chunk still fits.
pub const MAX_EXTENT: i32 = i32::MAX - 2 * CHUNK_SIZE;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub regions: Vec<RegionConfig>,
    pub queue: QueueConfig,
    pub teleport: TeleportConfig,
    /// Named overrides of `teleport`, e.g. for privileged agents.
    pub kinds: HashMap<String, KindConfig>,
    pub economy: EconomyConfig,
    /// `None` uses the standard hazard and ocean lists.
    pub blacklist: Option<BlacklistConfig>,
    pub search: SearchConfig,
    pub exclusions: Vec<ExclusionConfig>,
    pub debug: DebugConfig,
}

impl Config {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text)?;
        debug!(path = %path.display(), regions = config.regions.len(), "loaded config");
        Ok(config)
    }

    /// Parse and validate.
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.regions.is_empty() {
            return Err(ConfigError::invalid("no regions configured"));
        }
        if self.queue.size == 0 {
            return Err(ConfigError::invalid("queue.size must be at least 1"));
        }
        if self.search.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("search.poll_interval_ms must be positive"));
        }
        if self.search.max_attempts == Some(0) {
            return Err(ConfigError::invalid("search.max_attempts must be positive or null"));
        }
        if !self.economy.price.is_finite() || self.economy.price < 0.0 {
            return Err(ConfigError::invalid("economy.price must be a non-negative number"));
        }

        for (name, kind) in &self.kinds {
            if kind.price.is_some_and(|price| !price.is_finite() || price < 0.0) {
                return Err(ConfigError::invalid(format!(
                    "kinds.{name}.price must be a non-negative number"
                )));
            }
        }

        let mut seen = HashSet::new();
        for region in &self.regions {
            if !seen.insert(region.id.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "region {} configured twice",
                    region.id
                )));
            }
            region.validate()?;
        }

        for exclusion in &self.exclusions {
            if !seen.contains(exclusion.region.as_str()) {
                warn!(
                    exclusion = %exclusion.name,
                    region = %exclusion.region,
                    "exclusion zone refers to an unconfigured region"
                );
            }
        }
        Ok(())
    }

    /// Region descriptors paired with their queue capacity.
    pub fn regions(&self) -> ConfigResult<Vec<(Region, usize)>> {
        self.regions
            .iter()
            .map(|region| {
                let capacity = region.queue_size.unwrap_or(self.queue.size);
                Ok((region.to_region()?, capacity))
            })
            .collect()
    }

    /// Blacklists plus one validator per exclusion zone.
    #[must_use]
    pub fn criteria(&self) -> SafetyCriteria {
        let mut criteria = match &self.blacklist {
            Some(blacklist) => SafetyCriteria::new()
                .disallow_materials(blacklist.materials.iter().copied())
                .disallow_biomes(blacklist.biomes.iter().copied()),
            None => SafetyCriteria::standard(),
        };
        for exclusion in &self.exclusions {
            criteria = criteria.with_validator(exclusion.to_zone());
        }
        criteria
    }

    #[must_use]
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_attempts: self.search.max_attempts,
        }
    }

    #[must_use]
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            poll_interval: Duration::from_millis(self.search.poll_interval_ms),
            revalidate_after: Duration::from_millis(self.search.revalidate_after_ms),
            refill_delay: Duration::from_millis(self.queue.refill_delay_ms),
            cooldown_horizon: self.longest_cooldown(),
        }
    }

    /// Longest cooldown any kind can ask for, the default `teleport` included.
    #[must_use]
    pub fn longest_cooldown(&self) -> Duration {
        let longest = self
            .kinds
            .values()
            .filter_map(|kind| kind.cooldown_ms)
            .fold(self.teleport.cooldown_ms, u64::max);
        Duration::from_millis(longest)
    }

    /// Relocation settings for a kind, `None` meaning the `teleport` defaults.
    pub fn settings(&self, kind: Option<&str>) -> ConfigResult<RelocationSettings> {
        let base = &self.teleport;
        let mut settings = RelocationSettings {
            cooldown: Duration::from_millis(base.cooldown_ms),
            delay: Duration::from_millis(base.delay_ms),
            cancel_on_move: base.cancel_on_move,
            grace: grace(base.grace_ms),
            price: self.economy.price,
        };

        if let Some(name) = kind {
            let kind = self
                .kinds
                .get(name)
                .ok_or_else(|| ConfigError::UnknownKind(name.to_owned()))?;
            if let Some(ms) = kind.cooldown_ms {
                settings.cooldown = Duration::from_millis(ms);
            }
            if let Some(ms) = kind.delay_ms {
                settings.delay = Duration::from_millis(ms);
            }
            if let Some(cancel) = kind.cancel_on_move {
                settings.cancel_on_move = cancel;
            }
            if let Some(ms) = kind.grace_ms {
                settings.grace = grace(ms);
            }
            if let Some(price) = kind.price {
                settings.price = price;
            }
        }
        Ok(settings)
    }
}

fn grace(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl RegionConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.radius < 0 {
            return Err(ConfigError::invalid(format!(
                "region {} has a negative radius",
                self.id
            )));
        }
        let center = i64::from(self.center_x.unsigned_abs().max(self.center_z.unsigned_abs()));
        if center + self.radius > i64::from(MAX_EXTENT) {
            return Err(ConfigError::invalid(format!(
                "region {} reaches past the world limit of {MAX_EXTENT} blocks",
                self.id
            )));
        }
        if self.queue_size == Some(0) {
            return Err(ConfigError::invalid(format!(
                "region {} has a zero queue size",
                self.id
            )));
        }
        if let Some(vertical) = self.vertical {
            if vertical.min > vertical.max {
                return Err(ConfigError::invalid(format!(
                    "region {} has vertical min {} above max {}",
                    self.id, vertical.min, vertical.max
                )));
            }
        }
        Ok(())
    }

    fn to_region(&self) -> ConfigResult<Region> {
        let radius = u32::try_from(self.radius).map_err(|_| {
            ConfigError::invalid(format!("region {} radius out of range", self.id))
        })?;
        let region = Region::new(self.id.clone(), self.center_x, self.center_z, radius);
        Ok(match self.vertical {
            Some(vertical) => region.with_vertical(vertical),
            None => region,
        })
    }
}

impl ExclusionConfig {
    fn to_zone(&self) -> ExclusionZone {
        self.areas.iter().fold(
            ExclusionZone::new(self.name.clone(), self.region.clone()),
            |zone, area| zone.with_area(Area::from_corners(area.from, area.to)),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use pretty_assertions::assert_eq;
    use rtp_search::PositionValidator as _;
    use rtp_world::{Biome, Material, Position, RegionId, VerticalRange};

    use super::*;

    const FULL: &str = r#"{
        "regions": [
            { "id": "overworld", "center_x": 100, "center_z": -50, "radius": 3000 },
            { "id": "mining", "radius": 500, "vertical": { "min": 10, "max": 40 }, "queue_size": 2 }
        ],
        "queue": { "size": 4, "refill_delay_ms": 1000 },
        "teleport": { "cooldown_ms": 60000, "delay_ms": 3000, "cancel_on_move": true, "grace_ms": 5000 },
        "kinds": { "vip": { "cooldown_ms": 5000, "delay_ms": 0 } },
        "economy": { "price": 12.5 },
        "blacklist": { "materials": ["lava", "cactus"], "biomes": ["ocean", "deep_ocean"] },
        "search": { "max_attempts": null, "revalidate_after_ms": 30000, "poll_interval_ms": 100 },
        "exclusions": [
            { "name": "spawn", "region": "overworld", "areas": [{ "from": [-10, -10], "to": [10, 10] }] }
        ],
        "debug": { "show_queue_population": true }
    }"#;

    #[test]
    fn empty_sections_use_defaults() {
        let config = Config::from_json(r#"{ "regions": [{ "id": "overworld", "radius": 1000 }] }"#)
            .unwrap();
        assert_eq!(config.queue.size, QueueConfig::default().size);
        assert_eq!(config.search.max_attempts, Some(rtp_search::DEFAULT_MAX_ATTEMPTS));
        assert!(config.criteria().is_material_disallowed(Material::Lava));
        assert!(config.criteria().is_biome_disallowed(Biome::FrozenOcean));
        assert!(!config.debug.show_queue_population);

        let settings = config.settings(None).unwrap();
        assert_eq!(settings.grace, None);
        assert_eq!(settings.price, 0.0);
    }

    #[test]
    fn full_config_converts() {
        let config = Config::from_json(FULL).unwrap();

        let regions = config.regions().unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].0.center_chunk().x, 6);
        assert_eq!(regions[0].1, 4);
        assert_eq!(regions[1].0.vertical, Some(VerticalRange::new(10, 40)));
        assert_eq!(regions[1].1, 2);

        let criteria = config.criteria();
        assert!(criteria.is_material_disallowed(Material::Cactus));
        assert!(!criteria.is_material_disallowed(Material::Fire));
        assert!(criteria.is_biome_disallowed(Biome::DeepOcean));
        assert!(!criteria.is_biome_disallowed(Biome::WarmOcean));

        let spawn = criteria.validators().next().unwrap();
        assert_eq!(spawn.name(), "spawn");
        let at = |x, z| Position::new(RegionId::new("overworld"), x, 64, z);
        assert!(!spawn.is_valid(&at(0, 0)));
        assert!(spawn.is_valid(&at(11, 0)));

        assert_eq!(config.search_options().max_attempts, None);
        assert_eq!(
            config.scheduler_options().revalidate_after,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn cooldown_horizon_covers_every_kind() {
        let config = Config::from_json(FULL).unwrap();
        assert_eq!(config.scheduler_options().cooldown_horizon, Duration::from_secs(60));

        let config = Config::from_json(
            r#"{
                "regions": [{ "id": "a", "radius": 5 }],
                "teleport": { "cooldown_ms": 1000 },
                "kinds": { "slow": { "cooldown_ms": 3600000 }, "fast": { "delay_ms": 0 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.longest_cooldown(), Duration::from_secs(3600));
    }

    #[test]
    fn kinds_override_defaults() {
        let config = Config::from_json(FULL).unwrap();

        let base = config.settings(None).unwrap();
        assert_eq!(base.cooldown, Duration::from_secs(60));
        assert_eq!(base.grace, Some(Duration::from_secs(5)));
        assert_eq!(base.price, 12.5);

        let vip = config.settings(Some("vip")).unwrap();
        assert_eq!(vip.cooldown, Duration::from_secs(5));
        assert_eq!(vip.delay, Duration::ZERO);
        assert!(vip.cancel_on_move);

        assert!(matches!(
            config.settings(Some("admin")),
            Err(ConfigError::UnknownKind(kind)) if kind == "admin"
        ));
    }

    #[test]
    fn rejects_unusable_values() {
        let cases = [
            r#"{ "regions": [] }"#,
            r#"{ "regions": [{ "id": "a", "radius": -5 }] }"#,
            r#"{ "regions": [{ "id": "a", "radius": 5, "vertical": { "min": 90, "max": 10 } }] }"#,
            r#"{ "regions": [{ "id": "a", "radius": 5, "queue_size": 0 }] }"#,
            r#"{ "regions": [{ "id": "a", "radius": 5 }, { "id": "a", "radius": 9 }] }"#,
            r#"{ "regions": [{ "id": "a", "radius": 5 }], "queue": { "size": 0 } }"#,
            r#"{ "regions": [{ "id": "a", "radius": 5 }], "search": { "poll_interval_ms": 0 } }"#,
            r#"{ "regions": [{ "id": "a", "radius": 5 }], "economy": { "price": -1 } }"#,
            r#"{ "regions": [{ "id": "a", "radius": 4294967295 }] }"#,
            r#"{ "regions": [{ "id": "a", "center_x": -2147483648, "radius": 0 }] }"#,
            r#"{ "regions": [{ "id": "a", "center_z": 2000000000, "radius": 200000000 }] }"#,
        ];
        for case in cases {
            let err = Config::from_json(case).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{case}: {err}");
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Config::from_json(r#"{ "regions": [{ "id": "a", "radius": "far" }] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));

        let err = Config::from_json(r#"{ "regoins": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.regions.len(), 2);

        let missing = Config::load(file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
