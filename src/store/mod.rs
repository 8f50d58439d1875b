//! The working store: the authoritative in-memory state of a running
//! simulation.
//!
//! Every mutation keeps the secondary indices (residency, eligible, fertile,
//! demographic counters) and the pending-operation sets in step with the
//! primary records. Nothing here talks to the durable store; see
//! [`crate::reconcile`] for that.

mod eligible;
mod families;
mod pending;
mod people;
mod reassign;
mod stats;
mod villages;

use std::collections::{BTreeMap, BTreeSet};

use crate::config::DemographicRules;
use crate::error::RecordError;
use crate::model::{
    EntityKind, Family, FamilyId, GameDate, Person, PersonId, RecordId, Tile, TileId, Village,
    VillageId,
};
use crate::worldgen::terrain::TileProperties;

pub use eligible::{EligibleIndex, eligible_key};
pub use pending::{KindSets, PendingDeletes, PendingOps, PendingRecords};
pub use reassign::{IdMappings, ReassignSummary};
pub use stats::{DemographicCounts, DemographicStats, PopulationSnapshot, VitalTotals};

#[derive(Debug, Clone, Default)]
pub struct PopulationStore {
    rules: DemographicRules,
    current_date: GameDate,
    tiles: BTreeMap<TileId, Tile>,
    people: BTreeMap<PersonId, Person>,
    families: BTreeMap<FamilyId, Family>,
    villages: BTreeMap<VillageId, Village>,
    /// `(tile, land chunk)` -> village on that plot.
    plots: BTreeMap<(TileId, u32), VillageId>,
    /// `(tile, land chunk)` -> people resident there.
    residents: BTreeMap<(TileId, u32), BTreeSet<PersonId>>,
    eligible: EligibleIndex,
    fertile: BTreeSet<FamilyId>,
    pending: PendingOps,
    counts: DemographicCounts,
    vitals: VitalTotals,
    /// Last provisional id handed out per kind. Never reset, so a provisional
    /// id is not reused within a process.
    provisional: BTreeMap<EntityKind, u64>,
}

impl PopulationStore {
    pub fn new(rules: DemographicRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    pub fn rules(&self) -> &DemographicRules {
        &self.rules
    }

    pub fn current_date(&self) -> GameDate {
        self.current_date
    }

    pub fn set_current_date(&mut self, date: GameDate) {
        self.current_date = date;
    }

    /// Mint a provisional id for a record created during simulation.
    pub fn next_provisional(&mut self, kind: EntityKind) -> u64 {
        let slot = self.provisional.entry(kind).or_insert(0);
        *slot += 1;
        *slot
    }

    /// Keep the provisional sequence ahead of a loaded provisional id.
    fn note_provisional(&mut self, kind: EntityKind, id: RecordId) {
        if let RecordId::Provisional(local) = id {
            let slot = self.provisional.entry(kind).or_insert(0);
            *slot = (*slot).max(local);
        }
    }

    pub fn pending(&self) -> &PendingOps {
        &self.pending
    }

    pub fn eligible(&self) -> &EligibleIndex {
        &self.eligible
    }

    pub fn fertile_families(&self) -> impl Iterator<Item = FamilyId> + '_ {
        self.fertile.iter().copied()
    }

    pub fn is_fertile(&self, id: FamilyId) -> bool {
        self.fertile.contains(&id)
    }

    /// Drop every record, index and pending operation. Rules and the
    /// provisional id sequence survive.
    pub fn flush(&mut self) {
        self.tiles.clear();
        self.people.clear();
        self.families.clear();
        self.villages.clear();
        self.plots.clear();
        self.residents.clear();
        self.eligible.clear();
        self.fertile.clear();
        self.pending.clear();
        self.counts = DemographicCounts::default();
        self.vitals = VitalTotals::default();
        self.current_date = GameDate::EPOCH;
    }

    pub fn set_tiles(&mut self, tiles: impl IntoIterator<Item = Tile>) {
        self.tiles = tiles.into_iter().map(|tile| (tile.id, tile)).collect();
    }

    /// Reject tiles outside the loaded world. Anything goes before tiles
    /// are loaded.
    pub(crate) fn check_tile(&self, id: TileId) -> Result<(), RecordError> {
        if self.tiles.is_empty() || self.tiles.contains_key(&id) {
            Ok(())
        } else {
            Err(RecordError::UnknownTile(id))
        }
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.tiles.values()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile_properties(&self, id: TileId) -> Option<TileProperties> {
        self.tiles.get(&id).map(|tile| TileProperties {
            terrain: tile.terrain,
            biome: tile.biome,
            fertility: tile.fertility,
            habitable: tile.habitable,
            latitude: tile.latitude,
            longitude: tile.longitude,
        })
    }

    /// Ids of habitable tiles, ascending.
    pub fn habitable_tile_ids(&self) -> Vec<TileId> {
        self.tiles
            .values()
            .filter(|tile| tile.habitable)
            .map(|tile| tile.id)
            .collect()
    }

    /// Rebuild every secondary index from the primary records.
    ///
    /// Used after a bulk load and when age-gated memberships need refreshing.
    pub fn rebuild_indices(&mut self, current: GameDate) {
        self.plots.clear();
        self.residents.clear();
        self.counts = DemographicCounts::default();
        for village in self.villages.values() {
            self.plots
                .insert((village.tile_id, village.land_chunk), village.id);
        }
        for person in self.people.values() {
            self.counts.add(person.sex);
            if let Some(chunk) = person.residency {
                self.residents
                    .entry((person.tile_id, chunk))
                    .or_default()
                    .insert(person.id);
            }
        }
        self.refresh_age_gated(current);
    }

    /// Re-derive the eligible and fertile sets, whose membership depends on
    /// age and therefore drifts as the calendar advances.
    pub fn refresh_age_gated(&mut self, current: GameDate) {
        self.eligible.clear();
        self.fertile.clear();
        let ids: Vec<PersonId> = self.people.keys().copied().collect();
        for id in ids {
            self.add_eligible_person(id, current);
        }
        let ids: Vec<FamilyId> = self.families.keys().copied().collect();
        for id in ids {
            self.add_fertile_family(id, current);
        }
    }

    /// Re-derive age-gated memberships for people whose age differs between
    /// `previous` and `current`, and for families whose wife is one of them.
    ///
    /// Still one age comparison per person, but sets are only touched for
    /// those who had a birthday. Returns how many people aged.
    pub fn refresh_birthdays(&mut self, previous: GameDate, current: GameDate) -> usize {
        let aged: BTreeSet<PersonId> = self
            .people
            .values()
            .filter(|person| person.age_on(previous) != person.age_on(current))
            .map(|person| person.id)
            .collect();
        if aged.is_empty() {
            return 0;
        }
        for &id in &aged {
            if let Some(person) = self.people.get(&id) {
                let (tile, sex) = (person.tile_id, person.sex);
                self.eligible.remove(id, Some(tile), Some(sex));
            }
            self.add_eligible_person(id, current);
        }
        let families: Vec<FamilyId> = self
            .families
            .values()
            .filter(|family| family.wife_id.is_some_and(|wife| aged.contains(&wife)))
            .map(|family| family.id)
            .collect();
        for id in families {
            self.add_fertile_family(id, current);
        }
        aged.len()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::DemographicRules;
    use crate::model::{GameDate, Person, PersonId, Sex, TileId};

    use super::PopulationStore;

    pub fn store() -> PopulationStore {
        PopulationStore::new(DemographicRules::default())
    }

    /// A durable person aged `age` on the epoch date.
    pub fn person(id: u64, tile: TileId, sex: Sex, age: u32) -> Person {
        let born = GameDate::new(GameDate::EPOCH.year() - age as i32, 1, 1);
        Person::new(PersonId::persisted(id), tile, sex, born)
    }
}
