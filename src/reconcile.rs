//! Persist pending working-store mutations and swap provisional ids for
//! durable ones.
//!
//! The pipeline allocates durable ids for every provisional record, rewrites
//! the batch, commits it in one durable transaction and only then re-keys the
//! working store. A failed commit leaves the pending sets exactly as they
//! were, so the same work is retried on the next run.

use serde::Serialize;
use tracing::{debug, info};

use crate::db::{DurableStore, PersistBatch, SequenceCounter};
use crate::error::ReconcileError;
use crate::id::IdAllocator;
use crate::model::{EntityKind, FamilyId, PersonId, VillageId};
use crate::store::{IdMappings, PopulationStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub reassigned: usize,
}

impl ReconcileSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub async fn reconcile<C, D>(
    store: &mut PopulationStore,
    allocator: &mut IdAllocator<C>,
    durable: &D,
) -> Result<ReconcileSummary, ReconcileError>
where
    C: SequenceCounter,
    D: DurableStore,
{
    let inserts = store.get_pending_inserts();
    let updates = store.get_pending_updates();
    let deletes = store.get_pending_deletes();
    if inserts.is_empty() && updates.is_empty() && deletes.is_empty() {
        debug!("nothing to reconcile");
        return Ok(ReconcileSummary::default());
    }

    let mut mappings = IdMappings::default();
    let people: Vec<PersonId> = inserts
        .people
        .iter()
        .map(|p| p.id)
        .filter(|id| id.is_provisional())
        .collect();
    for (old, id) in people
        .iter()
        .zip(allocator.id_batch(EntityKind::Person, people.len()).await?)
    {
        mappings.people.insert(*old, PersonId::persisted(id));
    }
    let families: Vec<FamilyId> = inserts
        .families
        .iter()
        .map(|f| f.id)
        .filter(|id| id.is_provisional())
        .collect();
    for (old, id) in families
        .iter()
        .zip(allocator.id_batch(EntityKind::Family, families.len()).await?)
    {
        mappings.families.insert(*old, FamilyId::persisted(id));
    }
    let villages: Vec<VillageId> = inserts
        .villages
        .iter()
        .map(|v| v.id)
        .filter(|id| id.is_provisional())
        .collect();
    for (old, id) in villages
        .iter()
        .zip(allocator.id_batch(EntityKind::Village, villages.len()).await?)
    {
        mappings.villages.insert(*old, VillageId::persisted(id));
    }

    let summary = ReconcileSummary {
        inserted: inserts.len(),
        updated: updates.len(),
        deleted: deletes.len(),
        reassigned: mappings.len(),
    };

    let mut batch = PersistBatch {
        deleted_people: deletes.people,
        deleted_families: deletes.families,
        deleted_villages: deletes.villages,
        ..PersistBatch::default()
    };
    for mut person in inserts.people.into_iter().chain(updates.people) {
        mappings.apply_to_person(&mut person);
        batch.people.push(person);
    }
    for mut family in inserts.families.into_iter().chain(updates.families) {
        mappings.apply_to_family(&mut family);
        batch.families.push(family);
    }
    for mut village in inserts.villages.into_iter().chain(updates.villages) {
        mappings.apply_to_village(&mut village);
        batch.villages.push(village);
    }
    if let Some(reference) = batch.first_provisional() {
        return Err(ReconcileError::DanglingReference(reference));
    }

    durable
        .persist(&batch)
        .await
        .map_err(ReconcileError::Persist)?;

    store.reassign_ids(&mappings);
    store.clear_pending_operations();
    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        deleted = summary.deleted,
        reassigned = summary.reassigned,
        "reconciled working store"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemographicRules;
    use crate::db::MemoryStore;
    use crate::model::{EntityKind, Family, GameDate, Person, PersonUpdate, Sex};

    fn fixture() -> (PopulationStore, IdAllocator<MemoryStore>, MemoryStore) {
        let durable = MemoryStore::new();
        let allocator = IdAllocator::new(durable.clone(), 1000);
        (PopulationStore::new(DemographicRules::default()), allocator, durable)
    }

    fn married_couple(store: &mut PopulationStore) -> (PersonId, PersonId, FamilyId) {
        let h = PersonId::provisional(store.next_provisional(EntityKind::Person));
        let w = PersonId::provisional(store.next_provisional(EntityKind::Person));
        store
            .add_person(Person::new(h, 2, Sex::Male, GameDate::new(3979, 1, 1)), true)
            .unwrap();
        store
            .add_person(Person::new(w, 2, Sex::Female, GameDate::new(3981, 1, 1)), true)
            .unwrap();
        let f = store.form_family(h, w, GameDate::EPOCH).unwrap();
        (h, w, f)
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let (mut store, mut allocator, durable) = fixture();
        married_couple(&mut store);

        let first = reconcile(&mut store, &mut allocator, &durable).await.unwrap();
        assert_eq!(first.inserted, 3);
        assert_eq!(first.reassigned, 3);
        assert!(store.pending().is_empty());
        assert_eq!(durable.commits(), 1);

        let second = reconcile(&mut store, &mut allocator, &durable).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(durable.commits(), 1);
    }

    #[tokio::test]
    async fn durable_records_match_the_rekeyed_store() {
        let (mut store, mut allocator, durable) = fixture();
        married_couple(&mut store);
        reconcile(&mut store, &mut allocator, &durable).await.unwrap();

        assert!(store.people().all(|p| !p.id.is_provisional()));
        let family: &Family = store.families().next().unwrap();
        let fid = family.id.durable().unwrap();
        assert_eq!(durable.family(fid).as_ref(), Some(family));
        for person in store.people() {
            let stored = durable.person(person.id.durable().unwrap()).unwrap();
            assert_eq!(&stored, person);
            assert_eq!(stored.family_id, Some(family.id));
        }
    }

    #[tokio::test]
    async fn failed_commit_leaves_pending_intact() {
        let (mut store, mut allocator, durable) = fixture();
        let (h, _, f) = married_couple(&mut store);
        let before = store.pending().clone();

        durable.fail_next_persists(1);
        let err = reconcile(&mut store, &mut allocator, &durable)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Persist(_)));
        assert_eq!(store.pending(), &before);
        assert!(store.get_person(h).is_some());
        assert!(store.get_family(f).is_some());
        assert!(durable.people().is_empty());

        let retry = reconcile(&mut store, &mut allocator, &durable).await.unwrap();
        assert_eq!(retry.inserted, 3);
        assert_eq!(durable.people().len(), 2);
    }

    #[tokio::test]
    async fn updates_and_deletes_reach_the_durable_store() {
        let (mut store, mut allocator, durable) = fixture();
        married_couple(&mut store);
        reconcile(&mut store, &mut allocator, &durable).await.unwrap();

        let ids: Vec<PersonId> = store.people().map(|p| p.id).collect();
        store
            .update_person(ids[0], PersonUpdate::move_to(5), GameDate::EPOCH)
            .unwrap();
        store.remove_person(ids[1], true);
        let summary = reconcile(&mut store, &mut allocator, &durable).await.unwrap();
        assert_eq!(summary.deleted, 1);
        assert_eq!(durable.person(ids[0].durable().unwrap()).unwrap().tile_id, 5);
        assert!(durable.person(ids[1].durable().unwrap()).is_none());
    }

    #[tokio::test]
    async fn references_to_unpersisted_records_are_refused() {
        let (mut store, mut allocator, durable) = fixture();
        let p = PersonId::persisted(1);
        store
            .add_person(Person::new(p, 0, Sex::Male, GameDate::new(3980, 1, 1)), false)
            .unwrap();
        let orphan = FamilyId::provisional(50);
        store
            .add_family(Family::new(orphan, p, p, 0), false)
            .unwrap();
        store
            .update_person(p, PersonUpdate::join_family(orphan), GameDate::EPOCH)
            .unwrap();

        let err = reconcile(&mut store, &mut allocator, &durable)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::DanglingReference(_)));
        assert!(!store.pending().is_empty());
        assert_eq!(durable.commits(), 0);
    }

    #[tokio::test]
    async fn allocation_failure_propagates() {
        let (mut store, mut allocator, durable) = fixture();
        married_couple(&mut store);
        durable.set_available(false);
        let err = reconcile(&mut store, &mut allocator, &durable)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Allocation(_)));
        assert_eq!(store.pending().inserts.len(), 3);
    }
}
