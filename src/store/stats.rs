use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{GameDate, Sex, TileId};

use super::PopulationStore;

/// Counters maintained on every person insert and removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DemographicCounts {
    pub total: u64,
    pub male: u64,
    pub female: u64,
}

impl DemographicCounts {
    pub(super) fn add(&mut self, sex: Sex) {
        self.total += 1;
        match sex {
            Sex::Male => self.male += 1,
            Sex::Female => self.female += 1,
        }
    }

    pub(super) fn remove(&mut self, sex: Sex) {
        self.total = self.total.saturating_sub(1);
        match sex {
            Sex::Male => self.male = self.male.saturating_sub(1),
            Sex::Female => self.female = self.female.saturating_sub(1),
        }
    }
}

/// Age and partnership breakdown computed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DemographicStats {
    pub total: u64,
    pub male: u64,
    pub female: u64,
    /// Younger than the adult age.
    pub minors: u64,
    pub working_age: u64,
    /// At or above the elderly age.
    pub elderly: u64,
    /// Unpartnered adult men.
    pub bachelors: u64,
    /// Unpartnered adult women.
    pub spinsters: u64,
    pub families: u64,
    pub pregnant_families: u64,
}

/// Running totals of vital events since the last restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VitalTotals {
    pub births: u64,
    pub deaths: u64,
    pub marriages: u64,
    pub pregnancies: u64,
    pub dissolutions: u64,
}

impl VitalTotals {
    pub fn absorb(&mut self, other: &VitalTotals) {
        self.births += other.births;
        self.deaths += other.deaths;
        self.marriages += other.marriages;
        self.pregnancies += other.pregnancies;
        self.dissolutions += other.dissolutions;
    }
}

/// Point-in-time population view handed to broadcasters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationSnapshot {
    pub tile_populations: BTreeMap<TileId, u64>,
    pub total_population: u64,
    pub total_tiles: usize,
    pub last_updated: GameDate,
}

impl PopulationStore {
    pub fn counts(&self) -> DemographicCounts {
        self.counts
    }

    pub fn vitals(&self) -> VitalTotals {
        self.vitals
    }

    /// Fold externally computed vital events into the running totals.
    pub fn record_vitals(&mut self, events: &VitalTotals) {
        self.vitals.absorb(events);
    }

    /// Headcount per tile. Tiles with nobody on them are absent.
    pub fn get_all_tile_populations(&self) -> BTreeMap<TileId, u64> {
        let mut populations = BTreeMap::new();
        for person in self.people.values() {
            *populations.entry(person.tile_id).or_insert(0) += 1;
        }
        populations
    }

    pub fn tile_population(&self, tile: TileId) -> u64 {
        self.people
            .values()
            .filter(|person| person.tile_id == tile)
            .count() as u64
    }

    pub fn get_demographic_stats(&self, current: GameDate) -> DemographicStats {
        let mut stats = DemographicStats {
            total: self.counts.total,
            male: self.counts.male,
            female: self.counts.female,
            families: self.families.len() as u64,
            pregnant_families: self.families.values().filter(|f| f.pregnant).count() as u64,
            ..DemographicStats::default()
        };
        for person in self.people.values() {
            let age = person.age_on(current);
            if age < self.rules.adult_age {
                stats.minors += 1;
                continue;
            }
            if age >= self.rules.elderly_age {
                stats.elderly += 1;
            } else {
                stats.working_age += 1;
            }
            if person.family_id.is_none() {
                match person.sex {
                    Sex::Male => stats.bachelors += 1,
                    Sex::Female => stats.spinsters += 1,
                }
            }
        }
        stats
    }

    pub fn snapshot(&self) -> PopulationSnapshot {
        let tile_populations = self.get_all_tile_populations();
        PopulationSnapshot {
            total_population: tile_populations.values().sum(),
            total_tiles: tile_populations.len(),
            tile_populations,
            last_updated: self.current_date,
        }
    }
}
