use bevy_ecs::component::Component;
use bevy_ecs::world::World;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::model::TileId;

use super::SimulationEngine;

/// Tile an engine-side person lives on.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnTile(pub TileId);

/// Reference [`SimulationEngine`] backed by a `bevy_ecs` world: one entity per
/// seeded person, headcounts drawn uniformly from a seeded RNG.
pub struct EcsEngine {
    world: World,
    rng: SmallRng,
}

impl EcsEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            world: World::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn tile_population(&mut self, tile: TileId) -> usize {
        let mut query = self.world.query::<&OnTile>();
        query
            .iter(&self.world)
            .filter(|on| on.0 == tile)
            .count()
    }
}

impl SimulationEngine for EcsEngine {
    fn seed_population_on_tile_range(&mut self, min: usize, max: usize, tile: TileId) -> usize {
        let count = if min >= max {
            min
        } else {
            self.rng.random_range(min..=max)
        };
        for _ in 0..count {
            self.world.spawn(OnTile(tile));
        }
        debug!(tile, count, "engine seeded tile");
        count
    }

    fn reset(&mut self, seed: u64) {
        self.world.clear_entities();
        self.rng = SmallRng::seed_from_u64(seed);
    }

    fn population(&mut self) -> usize {
        let mut query = self.world.query::<&OnTile>();
        query.iter(&self.world).count()
    }
}
