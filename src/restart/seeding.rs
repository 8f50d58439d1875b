use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::SmallRng;
use tracing::debug;

use crate::config::SeedingConfig;
use crate::engine::SimulationEngine;
use crate::error::RecordError;
use crate::model::{DAYS_PER_YEAR, GameDate, Person, PersonId, Sex, TileId, Village, VillageId};
use crate::store::PopulationStore;

/// A birth date on which someone is exactly `age` on `current`, placed
/// `offset` days (below one year) before that anniversary.
pub fn birth_date_for_age(current: GameDate, age: u32, offset: u32) -> GameDate {
    let offset = offset % DAYS_PER_YEAR;
    GameDate::from_day_number(
        current.day_number() - i64::from(age) * i64::from(DAYS_PER_YEAR) - i64::from(offset),
    )
}

/// Ask the engine for a headcount on each selected tile.
pub(super) fn plan_population<E: SimulationEngine>(
    engine: &mut E,
    tiles: &[TileId],
    config: &SeedingConfig,
) -> Vec<(TileId, usize)> {
    tiles
        .iter()
        .map(|&tile| {
            let count = engine.seed_population_on_tile_range(config.pop_min, config.pop_max, tile);
            (tile, count)
        })
        .collect()
}

/// Write seeded people with pre-allocated durable ids, in chunks of
/// `config.batch_size`, indexing each as eligible where they qualify.
pub(super) fn seed_people(
    store: &mut PopulationStore,
    plan: &[(TileId, usize)],
    ids: &[u64],
    rng: &mut SmallRng,
    config: &SeedingConfig,
    current: GameDate,
) -> Result<BTreeMap<TileId, Vec<PersonId>>, RecordError> {
    let assignments: Vec<TileId> = plan
        .iter()
        .flat_map(|&(tile, count)| std::iter::repeat_n(tile, count))
        .collect();
    let mut by_tile: BTreeMap<TileId, Vec<PersonId>> = BTreeMap::new();

    let chunk = config.batch_size.max(1);
    for (index, (tiles, ids)) in assignments
        .chunks(chunk)
        .zip(ids.chunks(chunk))
        .enumerate()
    {
        for (&tile, &id) in tiles.iter().zip(ids) {
            let sex = Sex::from_bool(rng.random_bool(0.5));
            let age = rng.random_range(config.min_age..=config.max_age);
            let born = birth_date_for_age(current, age, rng.random_range(0..DAYS_PER_YEAR));
            let id = PersonId::persisted(id);
            store.add_person(Person::new(id, tile, sex, born), true)?;
            store.add_eligible_person(id, current);
            by_tile.entry(tile).or_default().push(id);
        }
        debug!(chunk = index, people = tiles.len(), "seeded people");
    }
    Ok(by_tile)
}

/// Found `villages_per_tile` villages on each populated tile and house
/// residents in them up to capacity. Returns the number of villages.
pub(super) fn seed_villages(
    store: &mut PopulationStore,
    residents: &BTreeMap<TileId, Vec<PersonId>>,
    ids: &[u64],
    config: &SeedingConfig,
    current: GameDate,
) -> Result<usize, RecordError> {
    let mut ids = ids.iter().copied();
    let mut founded = 0;
    for (&tile, people) in residents {
        let mut people = people.iter().copied();
        for chunk in 0..config.villages_per_tile {
            let Some(id) = ids.next() else {
                return Ok(founded);
            };
            let id = VillageId::persisted(id);
            store.add_village(
                Village {
                    id,
                    tile_id: tile,
                    land_chunk: chunk,
                    cleared_chunks: config.cleared_chunks,
                    housing_capacity: config.housing_capacity,
                    occupants: Vec::new(),
                    food_stores: 0.0,
                    food_capacity: config.food_capacity,
                    food_production_rate: 0.0,
                },
                true,
            )?;
            founded += 1;
            for person in people.by_ref().take(config.housing_capacity as usize) {
                store.assign_residency(person, id, current)?;
            }
        }
    }
    Ok(founded)
}
