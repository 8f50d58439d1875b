use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{Family, FamilyId, Person, PersonId, Village, VillageId};

use super::PopulationStore;

/// Provisional-to-durable id mappings produced by one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMappings {
    pub people: BTreeMap<PersonId, PersonId>,
    pub families: BTreeMap<FamilyId, FamilyId>,
    pub villages: BTreeMap<VillageId, VillageId>,
}

impl IdMappings {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.families.is_empty() && self.villages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.people.len() + self.families.len() + self.villages.len()
    }

    pub fn person(&self, id: PersonId) -> PersonId {
        self.people.get(&id).copied().unwrap_or(id)
    }

    pub fn family(&self, id: FamilyId) -> FamilyId {
        self.families.get(&id).copied().unwrap_or(id)
    }

    pub fn village(&self, id: VillageId) -> VillageId {
        self.villages.get(&id).copied().unwrap_or(id)
    }

    /// Rewrite the person's own id and family reference.
    pub fn apply_to_person(&self, person: &mut Person) -> bool {
        let before = (person.id, person.family_id);
        person.id = self.person(person.id);
        person.family_id = person.family_id.map(|id| self.family(id));
        before != (person.id, person.family_id)
    }

    pub fn apply_to_family(&self, family: &mut Family) -> bool {
        let before = family.clone();
        family.id = self.family(family.id);
        family.husband_id = family.husband_id.map(|id| self.person(id));
        family.wife_id = family.wife_id.map(|id| self.person(id));
        for child in &mut family.children {
            *child = self.person(*child);
        }
        before != *family
    }

    pub fn apply_to_village(&self, village: &mut Village) -> bool {
        let before = (village.id, village.occupants.clone());
        village.id = self.village(village.id);
        for occupant in &mut village.occupants {
            *occupant = self.person(*occupant);
        }
        before != (village.id, village.occupants.clone())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassignSummary {
    pub people: usize,
    pub families: usize,
    pub villages: usize,
}

impl PopulationStore {
    /// Re-key records from provisional to durable ids and propagate the new
    /// ids through every reference and index.
    ///
    /// Re-keying is done in one pass over the mapped records; references are
    /// then rewritten in a second pass. A person remap may be referenced by
    /// any family (as a child who has since married) so all families and
    /// villages are revisited when people were remapped. A family remap is
    /// pushed onto every person holding the old family id.
    pub fn reassign_ids(&mut self, mappings: &IdMappings) -> ReassignSummary {
        let mut summary = ReassignSummary::default();
        if mappings.is_empty() {
            return summary;
        }

        for (&old, &new) in &mappings.people {
            let Some(mut person) = self.people.remove(&old) else {
                continue;
            };
            person.id = new;
            if let Some(chunk) = person.residency {
                if let Some(set) = self.residents.get_mut(&(person.tile_id, chunk)) {
                    if set.remove(&old) {
                        set.insert(new);
                    }
                }
            }
            self.eligible.rekey(old, new);
            rekey(&mut self.pending.inserts.people, old, new);
            rekey(&mut self.pending.updates.people, old, new);
            self.people.insert(new, person);
            summary.people += 1;
        }

        for (&old, &new) in &mappings.families {
            let Some(mut family) = self.families.remove(&old) else {
                continue;
            };
            family.id = new;
            if self.fertile.remove(&old) {
                self.fertile.insert(new);
            }
            rekey(&mut self.pending.inserts.families, old, new);
            rekey(&mut self.pending.updates.families, old, new);
            self.families.insert(new, family);
            summary.families += 1;
        }

        for (&old, &new) in &mappings.villages {
            let Some(mut village) = self.villages.remove(&old) else {
                continue;
            };
            village.id = new;
            self.plots
                .insert((village.tile_id, village.land_chunk), new);
            rekey(&mut self.pending.inserts.villages, old, new);
            rekey(&mut self.pending.updates.villages, old, new);
            self.villages.insert(new, village);
            summary.villages += 1;
        }

        if !mappings.people.is_empty() {
            for family in self.families.values_mut() {
                mappings.apply_to_family(family);
            }
            for village in self.villages.values_mut() {
                mappings.apply_to_village(village);
            }
        }
        if !mappings.families.is_empty() {
            for person in self.people.values_mut() {
                if person
                    .family_id
                    .is_some_and(|family| mappings.families.contains_key(&family))
                {
                    mappings.apply_to_person(person);
                }
            }
        }

        debug!(
            people = summary.people,
            families = summary.families,
            villages = summary.villages,
            "reassigned provisional ids"
        );
        summary
    }
}

fn rekey<T: Ord>(set: &mut std::collections::BTreeSet<T>, old: T, new: T) {
    if set.remove(&old) {
        set.insert(new);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::store;
    use super::*;
    use crate::model::{GameDate, Sex};

    #[test]
    fn remapped_family_keeps_every_link() {
        let mut store = store();
        let h = PersonId::provisional(1);
        let w = PersonId::provisional(2);
        store
            .add_person(Person::new(h, 4, Sex::Male, GameDate::new(3978, 1, 1)), true)
            .unwrap();
        store
            .add_person(Person::new(w, 4, Sex::Female, GameDate::new(3980, 1, 1)), true)
            .unwrap();
        let f = store.form_family(h, w, GameDate::EPOCH).unwrap();
        store
            .begin_pregnancy(f, GameDate::EPOCH, GameDate::EPOCH)
            .unwrap();
        let child = store.record_birth(f, Sex::Male, GameDate::EPOCH).unwrap();

        let mut mappings = IdMappings::default();
        mappings.people.insert(h, PersonId::persisted(101));
        mappings.people.insert(w, PersonId::persisted(102));
        mappings.people.insert(child, PersonId::persisted(103));
        mappings.families.insert(f, FamilyId::persisted(7));

        let summary = store.reassign_ids(&mappings);
        assert_eq!(summary.people, 3);
        assert_eq!(summary.families, 1);

        let family = store.get_family(FamilyId::persisted(7)).unwrap();
        assert_eq!(family.husband_id, Some(PersonId::persisted(101)));
        assert_eq!(family.wife_id, Some(PersonId::persisted(102)));
        assert_eq!(family.children, vec![PersonId::persisted(103)]);
        for id in [101, 102, 103] {
            let person = store.get_person(PersonId::persisted(id)).unwrap();
            assert_eq!(person.family_id, Some(FamilyId::persisted(7)));
        }
        assert!(store.get_person(h).is_none());
        assert!(store.is_fertile(FamilyId::persisted(7)));
        assert!(store.pending().inserts.people.contains(&PersonId::persisted(101)));
        assert!(store.pending().inserts.families.contains(&FamilyId::persisted(7)));
    }

    #[test]
    fn eligible_membership_follows_the_new_id() {
        let mut store = store();
        let old = PersonId::provisional(3);
        store
            .add_person(Person::new(old, 9, Sex::Female, GameDate::new(3980, 1, 1)), true)
            .unwrap();
        store.add_eligible_person(old, GameDate::EPOCH);

        let mut mappings = IdMappings::default();
        mappings.people.insert(old, PersonId::persisted(44));
        store.reassign_ids(&mappings);
        assert_eq!(
            store.eligible().locate(PersonId::persisted(44)),
            vec![(Sex::Female, 9)]
        );
        assert!(store.eligible().locate(old).is_empty());
    }

    #[test]
    fn family_remap_reaches_people_missing_from_the_record() {
        let mut store = store();
        let h = PersonId::persisted(1);
        let w = PersonId::persisted(2);
        let stray = PersonId::persisted(3);
        let f = FamilyId::provisional(1);
        for (id, sex) in [(h, Sex::Male), (w, Sex::Female)] {
            store
                .add_person(Person::new(id, 2, sex, GameDate::new(3980, 1, 1)), false)
                .unwrap();
        }
        store.add_family(Family::new(f, h, w, 2), true).unwrap();
        // As loaded from an older export, before joins were checked.
        let mut loaded = Person::new(stray, 2, Sex::Female, GameDate::new(3990, 1, 1));
        loaded.family_id = Some(f);
        store.add_person(loaded, false).unwrap();

        let mut mappings = IdMappings::default();
        mappings.families.insert(f, FamilyId::persisted(8));
        store.reassign_ids(&mappings);

        let stray = store.get_person(stray).unwrap();
        assert_eq!(stray.family_id, Some(FamilyId::persisted(8)));
    }

    #[test]
    fn empty_mappings_change_nothing() {
        let mut store = store();
        assert_eq!(store.reassign_ids(&IdMappings::default()), ReassignSummary::default());
    }
}
