use std::ops::RangeInclusive;

use serde::Deserialize;

use crate::model::Sex;
use crate::worldgen::WorldGenConfig;

/// Top-level configuration. Every field has a default, so any subset may be
/// supplied as JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub worldgen: WorldGenConfig,
    pub allocator: AllocatorConfig,
    pub seeding: SeedingConfig,
    pub rules: DemographicRules,
    pub food: FoodConfig,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Ids reserved from the durable counter per refill.
    pub block_size: u64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self { block_size: 1000 }
    }
}

/// Parameters for seeding a freshly generated world.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeedingConfig {
    /// Share of habitable tiles populated when no explicit count is given.
    pub tile_percent: u32,
    pub pop_min: usize,
    pub pop_max: usize,
    /// Age band (years) of seeded people.
    pub min_age: u32,
    pub max_age: u32,
    /// Upper bound on records written per chunk.
    pub batch_size: usize,
    pub villages_per_tile: u32,
    pub housing_capacity: u32,
    pub food_capacity: f64,
    pub cleared_chunks: u32,
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            tile_percent: 60,
            pop_min: 5,
            pop_max: 15,
            min_age: 18,
            max_age: 57,
            batch_size: 5000,
            villages_per_tile: 1,
            housing_capacity: 20,
            food_capacity: 1000.0,
            cleared_chunks: 4,
        }
    }
}

/// Age-gated business rules for the eligible-singles and fertile-family indices.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemographicRules {
    pub male_eligible: RangeInclusive<i32>,
    pub female_eligible: RangeInclusive<i32>,
    pub fertile_wife: RangeInclusive<i32>,
    pub max_children: usize,
    /// Age from which a person counts as elderly in demographic stats.
    pub elderly_age: i32,
    /// Age below which a person counts as a minor.
    pub adult_age: i32,
}

impl DemographicRules {
    pub fn eligible_band(&self, sex: Sex) -> &RangeInclusive<i32> {
        match sex {
            Sex::Male => &self.male_eligible,
            Sex::Female => &self.female_eligible,
        }
    }
}

impl Default for DemographicRules {
    fn default() -> Self {
        Self {
            male_eligible: 16..=45,
            female_eligible: 16..=30,
            fertile_wife: 16..=33,
            max_children: 5,
            elderly_age: 65,
            adult_age: 18,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FoodConfig {
    /// Scale factor `k` of the production formula.
    pub production_k: f64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self { production_k: 0.5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.allocator.block_size, 1000);
        assert_eq!(config.seeding.tile_percent, 60);
        assert_eq!(config.rules.max_children, 5);
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = EngineConfig::from_json(
            r#"{
                "seeding": { "pop_min": 2, "pop_max": 3 },
                "rules": { "female_eligible": { "start": 18, "end": 28 } },
                "worldgen": { "seed": 7 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.seeding.pop_min, 2);
        assert_eq!(config.seeding.pop_max, 3);
        assert_eq!(config.seeding.batch_size, 5000);
        assert_eq!(config.rules.female_eligible, 18..=28);
        assert_eq!(config.rules.male_eligible, 16..=45);
        assert_eq!(config.worldgen.seed, 7);
    }

    #[test]
    fn eligible_band_by_sex() {
        let rules = DemographicRules::default();
        assert_eq!(rules.eligible_band(Sex::Male), &(16..=45));
        assert_eq!(rules.eligible_band(Sex::Female), &(16..=30));
    }
}
