use tracing::{trace, warn};

use crate::error::RecordError;
use crate::model::{EntityKind, FamilyId, GameDate, Person, PersonId, PersonUpdate, Sex, TileId};

use super::PopulationStore;

impl PopulationStore {
    /// Insert a person. `is_new` marks the record for insertion into the
    /// durable store.
    pub fn add_person(&mut self, person: Person, is_new: bool) -> Result<(), RecordError> {
        if self.people.contains_key(&person.id) {
            return Err(RecordError::DuplicatePerson(person.id));
        }
        self.check_tile(person.tile_id)?;
        if let Some(chunk) = person.residency {
            self.enter_plot(person.id, person.tile_id, chunk)?;
        }
        if is_new {
            self.pending.inserts.people.insert(person.id);
        }
        self.note_provisional(EntityKind::Person, person.id.0);
        self.counts.add(person.sex);
        self.people.insert(person.id, person);
        Ok(())
    }

    pub fn get_person(&self, id: PersonId) -> Option<&Person> {
        self.people.get(&id)
    }

    pub fn people(&self) -> impl Iterator<Item = &Person> + '_ {
        self.people.values()
    }

    pub fn person_count(&self) -> usize {
        self.people.len()
    }

    /// Remove a person and every index entry that mentions them.
    ///
    /// Family records lose the reference; a removed wife ends any pregnancy.
    /// `track` records a durable delete for persisted ids.
    pub fn remove_person(&mut self, id: PersonId, track: bool) -> Option<Person> {
        let person = self.people.remove(&id)?;
        if let Some(chunk) = person.residency {
            self.leave_plot(id, person.tile_id, chunk);
        }
        self.eligible
            .remove(id, Some(person.tile_id), Some(person.sex));
        if let Some(family_id) = person.family_id {
            self.detach_from_family(family_id, id, true);
        }
        self.pending.forget_person(id, track);
        self.counts.remove(person.sex);
        trace!(%id, tile = person.tile_id, "removed person");
        Some(person)
    }

    /// Apply a partial update and re-derive index memberships affected by a
    /// tile, family or residency change.
    ///
    /// Moving to another tile without naming a residency clears the
    /// residency, since land chunks are numbered per tile.
    pub fn update_person(
        &mut self,
        id: PersonId,
        update: PersonUpdate,
        current: GameDate,
    ) -> Result<&Person, RecordError> {
        let old = self
            .people
            .get(&id)
            .cloned()
            .ok_or(RecordError::PersonNotFound(id))?;
        let mut new = old.clone();
        if let Some(tile) = update.tile_id {
            self.check_tile(tile)?;
            new.tile_id = tile;
            if tile != old.tile_id && update.residency.is_none() {
                new.residency = None;
            }
        }
        if let Some(residency) = update.residency {
            new.residency = residency;
        }
        if let Some(family) = update.family_id {
            if let Some(family_id) = family {
                let listed = self
                    .families
                    .get(&family_id)
                    .ok_or(RecordError::FamilyNotFound(family_id))?
                    .lists(id);
                if !listed {
                    return Err(RecordError::Invalid(format!(
                        "family {family_id} does not list {id}"
                    )));
                }
            }
            new.family_id = family;
        }
        if let Some(health) = update.health {
            new.health = health;
        }

        let old_plot = old.residency.map(|chunk| (old.tile_id, chunk));
        let new_plot = new.residency.map(|chunk| (new.tile_id, chunk));
        if old_plot != new_plot {
            if let Some((tile, chunk)) = new_plot {
                self.check_plot_room(tile, chunk)?;
            }
            if let Some((tile, chunk)) = old_plot {
                self.leave_plot(id, tile, chunk);
            }
            if let Some((tile, chunk)) = new_plot {
                self.enter_plot(id, tile, chunk)?;
            }
        }

        if old.family_id != new.family_id {
            if let Some(family_id) = old.family_id {
                // A departing spouse vacates their slot; children stay listed.
                self.detach_from_family(family_id, id, false);
            }
        }

        self.eligible.remove(id, Some(old.tile_id), Some(old.sex));
        self.people.insert(id, new);
        self.pending.mark_person_updated(id);
        self.add_eligible_person(id, current);
        self.people.get(&id).ok_or(RecordError::PersonNotFound(id))
    }

    /// Whether a stored person belongs in an eligible set on `current`.
    pub fn is_eligible(&self, person: &Person, current: GameDate) -> bool {
        person.family_id.is_none()
            && self
                .rules
                .eligible_band(person.sex)
                .contains(&person.age_on(current))
    }

    /// Index the person as eligible if they qualify on `current`. Returns
    /// whether they are now in their tile's eligible set.
    pub fn add_eligible_person(&mut self, id: PersonId, current: GameDate) -> bool {
        let Some(person) = self.people.get(&id) else {
            return false;
        };
        if !self.is_eligible(person, current) {
            return false;
        }
        let (sex, tile) = (person.sex, person.tile_id);
        self.eligible.insert(sex, tile, id);
        true
    }

    /// Remove the person from the eligible index. With tile and sex known this
    /// touches one set; otherwise every matching tile's set is scanned.
    pub fn remove_eligible_person(
        &mut self,
        id: PersonId,
        tile: Option<TileId>,
        sex: Option<Sex>,
    ) -> bool {
        let removed = self.eligible.remove(id, tile, sex);
        if !removed && (tile.is_none() || sex.is_none()) {
            warn!(%id, "eligible fallback scan found no membership");
        }
        removed
    }

    pub fn eligible_on_tile(&self, sex: Sex, tile: TileId) -> impl Iterator<Item = PersonId> + '_ {
        self.eligible.members(sex, tile)
    }

    /// People resident on a plot.
    pub fn residents(&self, tile: TileId, chunk: u32) -> impl Iterator<Item = PersonId> + '_ {
        self.residents
            .get(&(tile, chunk))
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub(super) fn check_plot_room(&self, tile: TileId, chunk: u32) -> Result<(), RecordError> {
        match self.plots.get(&(tile, chunk)) {
            Some(village_id) => match self.villages.get(village_id) {
                Some(village) if !village.has_room() => Err(RecordError::VillageFull(*village_id)),
                _ => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn enter_plot(&mut self, id: PersonId, tile: TileId, chunk: u32) -> Result<(), RecordError> {
        self.check_plot_room(tile, chunk)?;
        self.residents.entry((tile, chunk)).or_default().insert(id);
        if let Some(village_id) = self.plots.get(&(tile, chunk)).copied() {
            if let Some(village) = self.villages.get_mut(&village_id) {
                if !village.occupants.contains(&id) {
                    village.occupants.push(id);
                    self.pending.mark_village_updated(village_id);
                }
            }
        }
        Ok(())
    }

    fn leave_plot(&mut self, id: PersonId, tile: TileId, chunk: u32) {
        if let Some(set) = self.residents.get_mut(&(tile, chunk)) {
            set.remove(&id);
            if set.is_empty() {
                self.residents.remove(&(tile, chunk));
            }
        }
        if let Some(village_id) = self.plots.get(&(tile, chunk)).copied() {
            if let Some(village) = self.villages.get_mut(&village_id) {
                let before = village.occupants.len();
                village.occupants.retain(|occupant| *occupant != id);
                if village.occupants.len() != before {
                    self.pending.mark_village_updated(village_id);
                }
            }
        }
    }

    /// Drop a person from their family record. A removed wife ends any
    /// pregnancy and the family's fertility.
    fn detach_from_family(&mut self, family_id: FamilyId, id: PersonId, including_children: bool) {
        let Some(family) = self.families.get_mut(&family_id) else {
            return;
        };
        if family.husband_id == Some(id) {
            family.husband_id = None;
        }
        if family.wife_id == Some(id) {
            family.wife_id = None;
            family.pregnant = false;
            family.delivery_date = None;
            self.fertile.remove(&family_id);
        }
        if including_children {
            family.children.retain(|child| *child != id);
        }
        self.pending.mark_family_updated(family_id);
    }
}
