use tracing::debug;

use crate::error::RecordError;
use crate::model::{
    EntityKind, Family, FamilyId, FamilyUpdate, GameDate, Person, PersonId, PersonUpdate, Sex,
};

use super::PopulationStore;

impl PopulationStore {
    pub fn add_family(&mut self, family: Family, is_new: bool) -> Result<(), RecordError> {
        if self.families.contains_key(&family.id) {
            return Err(RecordError::DuplicateFamily(family.id));
        }
        family.validate().map_err(RecordError::Invalid)?;
        if is_new {
            self.pending.inserts.families.insert(family.id);
        }
        self.note_provisional(EntityKind::Family, family.id.0);
        self.families.insert(family.id, family);
        Ok(())
    }

    pub fn get_family(&self, id: FamilyId) -> Option<&Family> {
        self.families.get(&id)
    }

    pub fn families(&self) -> impl Iterator<Item = &Family> + '_ {
        self.families.values()
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    /// Apply a partial update, validate the result and re-derive fertility.
    pub fn update_family(
        &mut self,
        id: FamilyId,
        update: FamilyUpdate,
        current: GameDate,
    ) -> Result<&Family, RecordError> {
        let mut family = self
            .families
            .get(&id)
            .cloned()
            .ok_or(RecordError::FamilyNotFound(id))?;
        if let Some(husband) = update.husband_id {
            family.husband_id = husband;
        }
        if let Some(wife) = update.wife_id {
            family.wife_id = wife;
        }
        if let Some(pregnant) = update.pregnant {
            family.pregnant = pregnant;
        }
        if let Some(delivery) = update.delivery_date {
            family.delivery_date = delivery;
        }
        if let Some(children) = update.children {
            family.children = children;
        }
        family.validate().map_err(RecordError::Invalid)?;
        self.families.insert(id, family);
        self.pending.mark_family_updated(id);
        self.add_fertile_family(id, current);
        self.families.get(&id).ok_or(RecordError::FamilyNotFound(id))
    }

    /// Remove a family. Members are released, which returns qualifying
    /// adults to their tile's eligible set.
    pub fn remove_family(
        &mut self,
        id: FamilyId,
        track: bool,
        current: GameDate,
    ) -> Option<Family> {
        let family = self.families.get(&id)?.clone();
        for member in family.members() {
            if self
                .people
                .get(&member)
                .is_some_and(|person| person.family_id == Some(id))
            {
                // The member exists and the family does too, so this cannot fail.
                let _ = self.update_person(member, PersonUpdate::leave_family(), current);
            }
        }
        self.fertile.remove(&id);
        self.pending.forget_family(id, track);
        self.families.remove(&id)
    }

    /// Add the family to the fertile set if it qualifies on `current`:
    /// not pregnant, below the child limit, and a wife inside the fertile
    /// age band. A family that no longer qualifies is evicted.
    pub fn add_fertile_family(&mut self, id: FamilyId, current: GameDate) -> bool {
        let qualifies = self.families.get(&id).is_some_and(|family| {
            !family.pregnant
                && family.children.len() < self.rules.max_children
                && family
                    .wife_id
                    .and_then(|wife| self.people.get(&wife))
                    .is_some_and(|wife| self.rules.fertile_wife.contains(&wife.age_on(current)))
        });
        if qualifies {
            self.fertile.insert(id);
        } else {
            self.fertile.remove(&id);
        }
        qualifies
    }

    /// Idempotent.
    pub fn remove_fertile_family(&mut self, id: FamilyId) -> bool {
        self.fertile.remove(&id)
    }

    /// Marry two single people. The family lives on the husband's tile.
    pub fn form_family(
        &mut self,
        husband: PersonId,
        wife: PersonId,
        current: GameDate,
    ) -> Result<FamilyId, RecordError> {
        let (tile_id, husband_sex) = {
            let h = self
                .people
                .get(&husband)
                .ok_or(RecordError::PersonNotFound(husband))?;
            check_single(h)?;
            (h.tile_id, h.sex)
        };
        let wife_sex = {
            let w = self
                .people
                .get(&wife)
                .ok_or(RecordError::PersonNotFound(wife))?;
            check_single(w)?;
            w.sex
        };
        if husband_sex != Sex::Male || wife_sex != Sex::Female {
            return Err(RecordError::Invalid(format!(
                "{husband} and {wife} cannot form a family as husband and wife"
            )));
        }

        let id = FamilyId::provisional(self.next_provisional(EntityKind::Family));
        self.add_family(Family::new(id, husband, wife, tile_id), true)?;
        self.update_person(husband, PersonUpdate::join_family(id), current)?;
        self.update_person(wife, PersonUpdate::join_family(id), current)?;
        self.add_fertile_family(id, current);
        self.vitals.marriages += 1;
        debug!(%id, %husband, %wife, tile = tile_id, "family formed");
        Ok(id)
    }

    pub fn begin_pregnancy(
        &mut self,
        id: FamilyId,
        delivery: GameDate,
        current: GameDate,
    ) -> Result<(), RecordError> {
        let family = self
            .families
            .get(&id)
            .ok_or(RecordError::FamilyNotFound(id))?;
        if family.pregnant {
            return Err(RecordError::Invalid(format!("family {id} is already pregnant")));
        }
        let update = FamilyUpdate {
            pregnant: Some(true),
            delivery_date: Some(Some(delivery)),
            ..FamilyUpdate::default()
        };
        self.update_family(id, update, current)?;
        self.vitals.pregnancies += 1;
        Ok(())
    }

    /// Deliver a child into the family. The child shares the mother's plot
    /// when its village has room.
    pub fn record_birth(
        &mut self,
        id: FamilyId,
        sex: Sex,
        current: GameDate,
    ) -> Result<PersonId, RecordError> {
        let family = self
            .families
            .get(&id)
            .cloned()
            .ok_or(RecordError::FamilyNotFound(id))?;
        let mother = family
            .wife_id
            .and_then(|wife| self.people.get(&wife))
            .ok_or_else(|| RecordError::Invalid(format!("family {id} has no mother")))?;
        let residency = mother.residency.filter(|chunk| {
            mother.tile_id == family.tile_id
                && self.check_plot_room(mother.tile_id, *chunk).is_ok()
        });

        let child_id = PersonId::provisional(self.next_provisional(EntityKind::Person));
        let mut child = Person::new(child_id, family.tile_id, sex, current);
        child.family_id = Some(id);
        child.residency = residency;
        self.add_person(child, true)?;

        let mut children = family.children;
        children.push(child_id);
        let update = FamilyUpdate {
            pregnant: Some(false),
            delivery_date: Some(None),
            children: Some(children),
            ..FamilyUpdate::default()
        };
        self.update_family(id, update, current)?;
        self.vitals.births += 1;
        Ok(child_id)
    }

    /// Remove a family and release its members.
    pub fn dissolve_family(
        &mut self,
        id: FamilyId,
        current: GameDate,
    ) -> Result<Family, RecordError> {
        let family = self
            .remove_family(id, true, current)
            .ok_or(RecordError::FamilyNotFound(id))?;
        self.vitals.dissolutions += 1;
        Ok(family)
    }
}

fn check_single(person: &Person) -> Result<(), RecordError> {
    match person.family_id {
        Some(family) => Err(RecordError::Invalid(format!(
            "{} already belongs to family {family}",
            person.id
        ))),
        None => Ok(()),
    }
}
