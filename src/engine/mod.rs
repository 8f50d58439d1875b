//! Seams to the collaborators this crate drives but does not own: the
//! simulation engine that decides populations, the tick driver that owns the
//! calendar, and the broadcast layer that publishes results.

pub mod clock;
pub mod ecs;

use serde::{Deserialize, Serialize};

use crate::model::{GameDate, TileId};
use crate::restart::RestartResult;
use crate::store::{PopulationSnapshot, VitalTotals};

pub use clock::SimClock;
pub use ecs::EcsEngine;

/// Vital events reported by the tick driver for the elapsed period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickResult {
    pub births: u64,
    pub deaths: u64,
    pub marriages: u64,
    pub pregnancies: u64,
    pub dissolutions: u64,
}

impl From<&TickResult> for VitalTotals {
    fn from(result: &TickResult) -> Self {
        VitalTotals {
            births: result.births,
            deaths: result.deaths,
            marriages: result.marriages,
            pregnancies: result.pregnancies,
            dissolutions: result.dissolutions,
        }
    }
}

pub trait SimulationEngine {
    /// Decide a population for `tile` within `min..=max` and take ownership
    /// of it. Returns the headcount.
    fn seed_population_on_tile_range(&mut self, min: usize, max: usize, tile: TileId) -> usize;

    /// Discard all engine state and reseed.
    fn reset(&mut self, seed: u64);

    fn population(&mut self) -> usize;
}

pub trait TickDriver {
    fn is_running(&self) -> bool;

    fn pause(&mut self);

    fn resume(&mut self);

    fn current_date(&self) -> GameDate;

    /// Rewind the calendar to [`GameDate::EPOCH`].
    fn reset_calendar(&mut self);
}

pub trait Broadcaster {
    fn population(&mut self, snapshot: &PopulationSnapshot);

    fn restart_complete(&mut self, result: &RestartResult);
}

/// Broadcaster that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Broadcaster for Silent {
    fn population(&mut self, _snapshot: &PopulationSnapshot) {}

    fn restart_complete(&mut self, _result: &RestartResult) {}
}
