use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::FoodConfig;
use crate::model::{TileId, VillageId};
use crate::store::PopulationStore;

/// Food produced per tick by a village.
pub fn production_rate(fertility: u8, cleared_chunks: u32, population: u64, k: f64) -> f64 {
    let rate =
        (f64::from(fertility) / 100.0) * f64::from(cleared_chunks) * ((population + 1) as f64).sqrt() * k;
    rate.max(0.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FoodTickSummary {
    pub villages: usize,
    pub produced: f64,
    /// Villages whose population came from the tile headcount because no
    /// one was resident on the village plot.
    pub fallbacks: usize,
}

/// Advance food stores of every village by one tick.
///
/// Rates are computed for all villages first and written back in a second
/// pass. Stores are clamped to `[0, capacity]`.
pub fn apply_food_tick(store: &mut PopulationStore, config: &FoodConfig) -> FoodTickSummary {
    let mut summary = FoodTickSummary::default();
    let mut tile_counts: Option<BTreeMap<TileId, u64>> = None;
    let mut updates: Vec<(VillageId, f64, f64)> = Vec::with_capacity(store.village_count());

    for village in store.villages() {
        let fertility = store
            .tile(village.tile_id)
            .map_or(0, |tile| tile.fertility);
        let mut population = store
            .residents(village.tile_id, village.land_chunk)
            .count() as u64;
        if population == 0 {
            let counts = tile_counts.get_or_insert_with(|| store.get_all_tile_populations());
            population = counts.get(&village.tile_id).copied().unwrap_or(0);
            summary.fallbacks += 1;
        }
        let rate = production_rate(fertility, village.cleared_chunks, population, config.production_k);
        let stores = (village.food_stores + rate).clamp(0.0, village.food_capacity);
        summary.produced += stores - village.food_stores;
        updates.push((village.id, stores, rate));
    }

    for (id, stores, rate) in updates {
        if let Err(err) = store.set_village_food(id, stores, rate) {
            warn!(%id, %err, "food update rejected");
            continue;
        }
        summary.villages += 1;
    }
    debug!(
        villages = summary.villages,
        produced = summary.produced,
        fallbacks = summary.fallbacks,
        "food tick"
    );
    summary
}
