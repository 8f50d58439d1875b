//! Full world restart: wipe both stores, regenerate terrain from a seed,
//! seed a population and report the outcome as a structured result.
//!
//! Phases run strictly in order under the restart flag, which suppresses
//! ticks. Generation and parameter validation happen before the first
//! destructive phase, so a bad seed or configuration leaves the old world
//! intact.

mod integrity;
mod seeding;

use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::db::DurableStore;
use crate::engine::{Broadcaster, SimulationEngine, TickDriver};
use crate::error::{GenerationError, RestartError};
use crate::model::{EntityKind, GameDate, Tile};
use crate::simulation::Simulation;
use crate::worldgen::{self, SphereTopology};

pub use integrity::{IntegrityReport, verify_integrity};
pub use seeding::birth_date_for_age;

#[derive(Debug, Clone)]
pub struct RestartOptions {
    /// Overrides the configured world seed.
    pub seed: Option<u64>,
    /// Populate exactly this many habitable tiles instead of a percentage.
    pub tile_count: Option<usize>,
    /// Rewind the tick driver's calendar to the epoch.
    pub reset_calendar: bool,
    /// Tile layout to use instead of the configured Fibonacci sphere.
    pub topology: Option<SphereTopology>,
}

impl Default for RestartOptions {
    fn default() -> Self {
        Self {
            seed: None,
            tile_count: None,
            reset_calendar: true,
            topology: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartResult {
    pub success: bool,
    pub seed: u64,
    pub tiles: usize,
    pub populated_tiles: usize,
    pub people: usize,
    pub villages: usize,
    /// Wall-clock milliseconds.
    #[serde(rename = "elapsed")]
    pub elapsed_ms: u64,
    pub integrity: IntegrityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct Seeded {
    tiles: usize,
    populated_tiles: usize,
    people: usize,
    villages: usize,
    integrity: IntegrityReport,
}

/// Restart the world. Never returns an error: failures are reported through
/// `success: false` and a message in `error`.
///
/// On failure the tick driver is left paused, since the world may be half
/// rebuilt.
pub async fn restart_world<D, E, T, B>(
    sim: &mut Simulation<D, E, T, B>,
    options: RestartOptions,
) -> RestartResult
where
    D: DurableStore + Clone,
    E: SimulationEngine,
    T: TickDriver,
    B: Broadcaster,
{
    let started = Instant::now();
    let seed = options.seed.unwrap_or(sim.config.worldgen.seed);
    let flag = sim.restart_flag();

    let outcome = match flag.try_begin() {
        Some(_guard) => run(sim, seed, options).await,
        None => Err(RestartError::AlreadyRestarting),
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(seeded) => {
            let result = RestartResult {
                success: true,
                seed,
                tiles: seeded.tiles,
                populated_tiles: seeded.populated_tiles,
                people: seeded.people,
                villages: seeded.villages,
                elapsed_ms,
                integrity: seeded.integrity,
                error: None,
            };
            info!(seed, people = result.people, elapsed_ms, "world restart complete");
            sim.broadcaster.restart_complete(&result);
            sim.broadcaster.population(&sim.store.snapshot());
            result
        }
        Err(err) => {
            error!(seed, %err, "world restart failed");
            RestartResult {
                seed,
                elapsed_ms,
                error: Some(err.to_string()),
                ..RestartResult::default()
            }
        }
    }
}

fn validate(config: &EngineConfig, options: &RestartOptions) -> Result<(), GenerationError> {
    let seeding = &config.seeding;
    if seeding.pop_min > seeding.pop_max {
        return Err(GenerationError::InvalidPopulationRange {
            min: seeding.pop_min,
            max: seeding.pop_max,
        });
    }
    if seeding.min_age > seeding.max_age {
        return Err(GenerationError::InvalidAgeRange {
            min: seeding.min_age,
            max: seeding.max_age,
        });
    }
    if options.tile_count.is_none() && !(1..=100).contains(&seeding.tile_percent) {
        return Err(GenerationError::InvalidTilePercent(seeding.tile_percent));
    }
    if options.tile_count == Some(0) {
        return Err(GenerationError::ZeroTileCount);
    }
    Ok(())
}

async fn run<D, E, T, B>(
    sim: &mut Simulation<D, E, T, B>,
    seed: u64,
    options: RestartOptions,
) -> Result<Seeded, RestartError>
where
    D: DurableStore + Clone,
    E: SimulationEngine,
    T: TickDriver,
    B: Broadcaster,
{
    validate(&sim.config, &options)?;
    let topology = match options.topology {
        Some(topology) => topology,
        None => SphereTopology::fibonacci(
            sim.config.worldgen.tile_count,
            sim.config.worldgen.radius,
            sim.config.worldgen.neighbor_count,
        ),
    };
    let tiles: Vec<Tile> = worldgen::generate_tiles(&topology, seed)?;
    info!(seed, tiles = tiles.len(), "generated terrain");

    let was_running = sim.driver.is_running();
    if was_running {
        sim.driver.pause();
    }

    sim.store.flush();
    sim.durable.flush().await?;
    sim.engine.reset(seed);
    sim.allocator.reset().await?;
    info!("flushed working and durable stores");

    sim.durable.replace_tiles(&tiles).await?;
    let tile_count = tiles.len();
    sim.store.set_tiles(tiles);

    let habitable = sim.store.habitable_tile_ids();
    let wanted = match options.tile_count {
        Some(count) => count.min(habitable.len()),
        None => worldgen::percent_of(habitable.len(), sim.config.seeding.tile_percent),
    };
    let selected = worldgen::select_tiles(&habitable, seed, wanted);
    let plan = seeding::plan_population(&mut sim.engine, &selected, &sim.config.seeding);
    let total: usize = plan.iter().map(|(_, count)| count).sum();
    info!(
        habitable = habitable.len(),
        selected = selected.len(),
        people = total,
        "planned population"
    );

    let current = if options.reset_calendar {
        GameDate::EPOCH
    } else {
        sim.driver.current_date()
    };
    sim.store.set_current_date(current);

    let person_ids = sim.allocator.id_batch(EntityKind::Person, total).await?;
    let mut rng = SmallRng::seed_from_u64(seed);
    let residents = seeding::seed_people(
        &mut sim.store,
        &plan,
        &person_ids,
        &mut rng,
        &sim.config.seeding,
        current,
    )?;

    let village_count = residents.len() * sim.config.seeding.villages_per_tile as usize;
    let village_ids = sim
        .allocator
        .id_batch(EntityKind::Village, village_count)
        .await?;
    let villages = seeding::seed_villages(
        &mut sim.store,
        &residents,
        &village_ids,
        &sim.config.seeding,
        current,
    )?;

    let integrity = verify_integrity(&sim.store);
    if !integrity.valid {
        warn!(issues = integrity.issues.len(), "restart integrity check found issues");
        for issue in &integrity.issues {
            warn!(%issue, "integrity");
        }
    }

    if was_running {
        sim.driver.resume();
    }
    if options.reset_calendar {
        sim.driver.reset_calendar();
    }

    Ok(Seeded {
        tiles: tile_count,
        populated_tiles: residents.len(),
        people: sim.store.person_count(),
        villages,
        integrity,
    })
}
