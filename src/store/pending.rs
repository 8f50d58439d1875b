use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{Family, FamilyId, Person, PersonId, Village, VillageId};

use super::PopulationStore;

/// One id set per entity kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindSets {
    pub people: BTreeSet<PersonId>,
    pub families: BTreeSet<FamilyId>,
    pub villages: BTreeSet<VillageId>,
}

impl KindSets {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.families.is_empty() && self.villages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.people.len() + self.families.len() + self.villages.len()
    }

    fn clear(&mut self) {
        self.people.clear();
        self.families.clear();
        self.villages.clear();
    }
}

/// What reconciliation must persist. The working store itself is never diffed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingOps {
    /// Records not yet in the durable store.
    pub inserts: KindSets,
    /// Durable ids to delete.
    pub deletes: KindSets,
    /// Durable records whose fields changed.
    pub updates: KindSets,
}

impl PendingOps {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty() && self.updates.is_empty()
    }

    pub fn clear(&mut self) {
        self.inserts.clear();
        self.deletes.clear();
        self.updates.clear();
    }

    pub(super) fn mark_person_updated(&mut self, id: PersonId) {
        if id.durable().is_some() && !self.inserts.people.contains(&id) {
            self.updates.people.insert(id);
        }
    }

    pub(super) fn mark_family_updated(&mut self, id: FamilyId) {
        if id.durable().is_some() && !self.inserts.families.contains(&id) {
            self.updates.families.insert(id);
        }
    }

    pub(super) fn mark_village_updated(&mut self, id: VillageId) {
        if id.durable().is_some() && !self.inserts.villages.contains(&id) {
            self.updates.villages.insert(id);
        }
    }

    /// Forget a removed person. Returns true when a durable delete must be
    /// recorded (persisted id that is not merely awaiting its first insert).
    pub(super) fn forget_person(&mut self, id: PersonId, track: bool) -> bool {
        let never_written = self.inserts.people.remove(&id);
        self.updates.people.remove(&id);
        let record = track && id.durable().is_some() && !never_written;
        if record {
            self.deletes.people.insert(id);
        }
        record
    }

    pub(super) fn forget_family(&mut self, id: FamilyId, track: bool) -> bool {
        let never_written = self.inserts.families.remove(&id);
        self.updates.families.remove(&id);
        let record = track && id.durable().is_some() && !never_written;
        if record {
            self.deletes.families.insert(id);
        }
        record
    }

    pub(super) fn forget_village(&mut self, id: VillageId, track: bool) -> bool {
        let never_written = self.inserts.villages.remove(&id);
        self.updates.villages.remove(&id);
        let record = track && id.durable().is_some() && !never_written;
        if record {
            self.deletes.villages.insert(id);
        }
        record
    }
}

/// Current records behind a pending id set, read in one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PendingRecords {
    pub people: Vec<Person>,
    pub families: Vec<Family>,
    pub villages: Vec<Village>,
}

impl PendingRecords {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.families.is_empty() && self.villages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.people.len() + self.families.len() + self.villages.len()
    }
}

/// Durable ids awaiting deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingDeletes {
    pub people: Vec<u64>,
    pub families: Vec<u64>,
    pub villages: Vec<u64>,
}

impl PendingDeletes {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.families.is_empty() && self.villages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.people.len() + self.families.len() + self.villages.len()
    }
}

impl PopulationStore {
    /// Current records of everything awaiting first persistence.
    pub fn get_pending_inserts(&self) -> PendingRecords {
        self.read_pending(&self.pending.inserts)
    }

    /// Current records of persisted entities changed since the last commit.
    pub fn get_pending_updates(&self) -> PendingRecords {
        self.read_pending(&self.pending.updates)
    }

    pub fn get_pending_deletes(&self) -> PendingDeletes {
        let deletes = &self.pending.deletes;
        PendingDeletes {
            people: deletes.people.iter().filter_map(|id| id.durable()).collect(),
            families: deletes.families.iter().filter_map(|id| id.durable()).collect(),
            villages: deletes.villages.iter().filter_map(|id| id.durable()).collect(),
        }
    }

    /// Reinstate pending sets saved with an export. Ids no longer present
    /// are dropped from the insert and update sets; inserts are merged with
    /// those already marked on load.
    pub fn restore_pending(&mut self, inserts: KindSets, updates: KindSets, deletes: KindSets) {
        let mut updates = updates;
        self.retain_present(&mut updates);
        let mut inserts = inserts;
        self.retain_present(&mut inserts);
        self.pending.inserts.people.extend(inserts.people);
        self.pending.inserts.families.extend(inserts.families);
        self.pending.inserts.villages.extend(inserts.villages);
        self.pending.updates = updates;
        self.pending.deletes = deletes;
    }

    fn retain_present(&self, sets: &mut KindSets) {
        sets.people.retain(|id| self.people.contains_key(id));
        sets.families.retain(|id| self.families.contains_key(id));
        sets.villages.retain(|id| self.villages.contains_key(id));
    }

    /// Forget every pending operation. Call only after a durable commit.
    pub fn clear_pending_operations(&mut self) {
        self.pending.clear();
    }

    fn read_pending(&self, ids: &KindSets) -> PendingRecords {
        PendingRecords {
            people: ids
                .people
                .iter()
                .filter_map(|id| self.people.get(id).cloned())
                .collect(),
            families: ids
                .families
                .iter()
                .filter_map(|id| self.families.get(id).cloned())
                .collect(),
            villages: ids
                .villages
                .iter()
                .filter_map(|id| self.villages.get(id).cloned())
                .collect(),
        }
    }
}
