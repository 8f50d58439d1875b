use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;
use crate::model::{EntityKind, Family, Person, Tile, TileId, Village};

use super::{DurableStore, PersistBatch, SequenceCounter};

#[derive(Debug)]
struct MemoryInner {
    people: BTreeMap<u64, Person>,
    families: BTreeMap<u64, Family>,
    villages: BTreeMap<u64, Village>,
    tiles: BTreeMap<TileId, Tile>,
    counters: BTreeMap<EntityKind, u64>,
    available: bool,
    failing_persists: u32,
    commits: u64,
}

impl Default for MemoryInner {
    fn default() -> Self {
        Self {
            people: BTreeMap::new(),
            families: BTreeMap::new(),
            villages: BTreeMap::new(),
            tiles: BTreeMap::new(),
            counters: EntityKind::ALL.into_iter().map(|k| (k, 0)).collect(),
            available: true,
            failing_persists: 0,
            commits: 0,
        }
    }
}

/// In-process durable store with the same transactional contract as
/// [`PgStore`](super::PgStore). Clones share state, like a connection pool.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(inner: &MemoryInner) -> Result<(), StoreError> {
        if inner.available {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }

    /// Simulate losing (or regaining) the backing database.
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Make the next `n` calls to `persist` fail without writing anything.
    pub fn fail_next_persists(&self, n: u32) {
        self.lock().failing_persists = n;
    }

    /// Number of successfully committed batches.
    pub fn commits(&self) -> u64 {
        self.lock().commits
    }

    pub fn person(&self, id: u64) -> Option<Person> {
        self.lock().people.get(&id).cloned()
    }

    pub fn family(&self, id: u64) -> Option<Family> {
        self.lock().families.get(&id).cloned()
    }

    pub fn village(&self, id: u64) -> Option<Village> {
        self.lock().villages.get(&id).cloned()
    }

    pub fn tile(&self, id: TileId) -> Option<Tile> {
        self.lock().tiles.get(&id).cloned()
    }

    pub fn people(&self) -> Vec<Person> {
        self.lock().people.values().cloned().collect()
    }

    pub fn families(&self) -> Vec<Family> {
        self.lock().families.values().cloned().collect()
    }

    pub fn villages(&self) -> Vec<Village> {
        self.lock().villages.values().cloned().collect()
    }

    pub fn tile_count(&self) -> usize {
        self.lock().tiles.len()
    }

    pub fn counter_value(&self, kind: EntityKind) -> Option<u64> {
        self.lock().counters.get(&kind).copied()
    }
}

fn durable_key(id: crate::model::RecordId) -> Result<u64, StoreError> {
    id.durable()
        .ok_or_else(|| StoreError::ProvisionalId(id.to_string()))
}

impl SequenceCounter for MemoryStore {
    async fn advance(&self, kind: EntityKind, by: u64) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        let value = inner
            .counters
            .get_mut(&kind)
            .ok_or(StoreError::MissingCounter(kind))?;
        *value += by;
        Ok(*value)
    }

    async fn reset(&self, kind: EntityKind, origin: u64) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        inner.counters.insert(kind, origin);
        Ok(())
    }
}

impl DurableStore for MemoryStore {
    async fn persist(&self, batch: &PersistBatch) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        if inner.failing_persists > 0 {
            inner.failing_persists -= 1;
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        if let Some(what) = batch.first_provisional() {
            return Err(StoreError::ProvisionalId(what));
        }

        // Validation is complete; everything below is infallible, so the
        // batch is applied all-or-nothing.
        for p in &batch.people {
            inner.people.insert(durable_key(p.id.0)?, p.clone());
        }
        for f in &batch.families {
            inner.families.insert(durable_key(f.id.0)?, f.clone());
        }
        for v in &batch.villages {
            inner.villages.insert(durable_key(v.id.0)?, v.clone());
        }
        for id in &batch.deleted_people {
            inner.people.remove(id);
        }
        for id in &batch.deleted_families {
            inner.families.remove(id);
            // ON DELETE SET NULL
            for person in inner.people.values_mut() {
                if person.family_id.and_then(|f| f.durable()) == Some(*id) {
                    person.family_id = None;
                }
            }
        }
        for id in &batch.deleted_villages {
            inner.villages.remove(id);
        }
        inner.commits += 1;
        Ok(())
    }

    async fn replace_tiles(&self, tiles: &[Tile]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        inner.tiles = tiles.iter().map(|t| (t.id, t.clone())).collect();
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check_available(&inner)?;
        inner.people.clear();
        inner.families.clear();
        inner.villages.clear();
        inner.tiles.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GameDate, PersonId, Sex};

    fn person(id: u64) -> Person {
        Person::new(PersonId::persisted(id), 1, Sex::Female, GameDate::EPOCH)
    }

    #[tokio::test]
    async fn advance_is_fetch_and_add() {
        let store = MemoryStore::new();
        assert_eq!(store.advance(EntityKind::Person, 10).await.unwrap(), 10);
        assert_eq!(store.advance(EntityKind::Person, 5).await.unwrap(), 15);
        assert_eq!(store.advance(EntityKind::Family, 1).await.unwrap(), 1);
        store.reset(EntityKind::Person, 0).await.unwrap();
        assert_eq!(store.counter_value(EntityKind::Person), Some(0));
    }

    #[tokio::test]
    async fn provisional_batches_are_rejected_whole() {
        let store = MemoryStore::new();
        let batch = PersistBatch {
            people: vec![
                person(1),
                Person::new(PersonId::provisional(1), 1, Sex::Male, GameDate::EPOCH),
            ],
            ..PersistBatch::default()
        };
        assert!(matches!(
            store.persist(&batch).await,
            Err(StoreError::ProvisionalId(_))
        ));
        assert!(store.people().is_empty());
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn injected_failures_write_nothing() {
        let store = MemoryStore::new();
        store.fail_next_persists(1);
        let batch = PersistBatch {
            people: vec![person(1)],
            ..PersistBatch::default()
        };
        assert!(store.persist(&batch).await.is_err());
        assert!(store.person(1).is_none());
        store.persist(&batch).await.unwrap();
        assert!(store.person(1).is_some());
    }

    #[tokio::test]
    async fn deletes_and_flush() {
        let store = MemoryStore::new();
        let upsert = PersistBatch {
            people: vec![person(1), person(2)],
            ..PersistBatch::default()
        };
        store.persist(&upsert).await.unwrap();
        let delete = PersistBatch {
            deleted_people: vec![1],
            ..PersistBatch::default()
        };
        store.persist(&delete).await.unwrap();
        assert_eq!(store.people().len(), 1);
        store.flush().await.unwrap();
        assert!(store.people().is_empty());
    }

    #[tokio::test]
    async fn offline_store_refuses_everything() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(store.advance(EntityKind::Person, 1).await.is_err());
        assert!(store.flush().await.is_err());
        assert!(store.persist(&PersistBatch::default()).await.is_err());
    }
}
