#![allow(dead_code)]

use gridworld::config::EngineConfig;
use gridworld::db::MemoryStore;
use gridworld::engine::{Broadcaster, EcsEngine, SimClock};
use gridworld::model::{GameDate, Person, PersonId, Sex, TileId};
use gridworld::restart::RestartResult;
use gridworld::store::{PopulationSnapshot, PopulationStore};
use gridworld::worldgen::{SphereTopology, TileSeed, derive_tile_properties};
use gridworld::Simulation;

/// Broadcaster that keeps everything it is sent.
#[derive(Debug, Default)]
pub struct Recorder {
    pub snapshots: Vec<PopulationSnapshot>,
    pub restarts: Vec<RestartResult>,
}

impl Broadcaster for Recorder {
    fn population(&mut self, snapshot: &PopulationSnapshot) {
        self.snapshots.push(snapshot.clone());
    }

    fn restart_complete(&mut self, result: &RestartResult) {
        self.restarts.push(result.clone());
    }
}

pub type TestSim = Simulation<MemoryStore, EcsEngine, SimClock, Recorder>;

pub fn small_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.worldgen.tile_count = 300;
    config.allocator.block_size = 100;
    config.seeding.batch_size = 16;
    config
}

pub fn simulation(config: EngineConfig) -> TestSim {
    let seed = config.worldgen.seed;
    Simulation::new(
        config,
        MemoryStore::new(),
        EcsEngine::new(seed),
        SimClock::default(),
        Recorder::default(),
    )
}

/// A topology with exactly `habitable` habitable tiles for `seed`, plus up to
/// `barren` uninhabitable ones, drawn from a dense Fibonacci sphere.
pub fn topology_with_habitable(seed: u64, habitable: usize, barren: usize) -> SphereTopology {
    let dense = SphereTopology::fibonacci(2000, 30.0, 6);
    let mut good = Vec::new();
    let mut bad = Vec::new();
    for tile in dense.tiles {
        let [x, y, z] = tile.center;
        if derive_tile_properties(x, y, z, seed).habitable {
            if good.len() < habitable {
                good.push(tile);
            }
        } else if bad.len() < barren {
            bad.push(tile);
        }
    }
    assert_eq!(good.len(), habitable, "dense sphere has too few habitable tiles");
    let tiles: Vec<TileSeed> = good
        .into_iter()
        .chain(bad)
        .enumerate()
        .map(|(id, tile)| TileSeed {
            id: id as TileId,
            neighbors: Vec::new(),
            ..tile
        })
        .collect();
    SphereTopology::from_tiles(30.0, tiles)
}

pub fn person_aged(id: u64, tile: TileId, sex: Sex, age: i32, on: GameDate) -> Person {
    let born = GameDate::new(on.year() - age, on.month(), on.day());
    Person::new(PersonId::persisted(id), tile, sex, born)
}

/// Assert every eligible-index membership matches the records.
pub fn assert_eligible_consistent(store: &PopulationStore, current: GameDate) {
    for person in store.people() {
        let expected = if store.is_eligible(person, current) {
            vec![(person.sex, person.tile_id)]
        } else {
            Vec::new()
        };
        assert_eq!(
            store.eligible().locate(person.id),
            expected,
            "eligible membership of {} (age {}, family {:?})",
            person.id,
            person.age_on(current),
            person.family_id
        );
    }
    let indexed: usize = store.people().filter(|p| store.is_eligible(p, current)).count();
    assert_eq!(store.eligible().len(), indexed, "index holds unknown people");
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
