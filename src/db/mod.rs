//! Durable relational mirror of the working store.
//!
//! The working store never writes here directly; only reconciliation
//! ([`crate::reconcile`]) and world restart do.

mod load;
pub mod memory;
pub mod postgres;

use std::future::Future;

use serde::Serialize;

use crate::error::StoreError;
use crate::model::{EntityKind, Family, Person, Tile, Village};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Durable monotonic counters backing the id allocator.
pub trait SequenceCounter {
    /// Atomically add `by` to the counter for `kind` and return the new value.
    /// The ids `new - by + 1 ..= new` then belong exclusively to the caller.
    fn advance(
        &self,
        kind: EntityKind,
        by: u64,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn reset(
        &self,
        kind: EntityKind,
        origin: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

pub trait DurableStore: SequenceCounter {
    /// Write one reconciliation batch atomically: either every upsert and
    /// delete lands or none does.
    fn persist(&self, batch: &PersistBatch) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replace the whole tile table.
    fn replace_tiles(&self, tiles: &[Tile]) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove every person, family, village and tile.
    fn flush(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Records to upsert and durable ids to delete, with every id already persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistBatch {
    pub people: Vec<Person>,
    pub families: Vec<Family>,
    pub villages: Vec<Village>,
    pub deleted_people: Vec<u64>,
    pub deleted_families: Vec<u64>,
    pub deleted_villages: Vec<u64>,
}

impl PersistBatch {
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
            && self.families.is_empty()
            && self.villages.is_empty()
            && self.deleted_people.is_empty()
            && self.deleted_families.is_empty()
            && self.deleted_villages.is_empty()
    }

    /// Describe the first provisional id anywhere in the batch, if any.
    pub fn first_provisional(&self) -> Option<String> {
        for p in &self.people {
            if p.id.is_provisional() {
                return Some(format!("person {}", p.id));
            }
            if let Some(f) = p.family_id.filter(|f| f.is_provisional()) {
                return Some(format!("family {f} (of person {})", p.id));
            }
        }
        for f in &self.families {
            if f.id.is_provisional() {
                return Some(format!("family {}", f.id));
            }
            if let Some(p) = f.members().find(|p| p.is_provisional()) {
                return Some(format!("person {p} (in family {})", f.id));
            }
        }
        for v in &self.villages {
            if v.id.is_provisional() {
                return Some(format!("village {}", v.id));
            }
            if let Some(p) = v.occupants.iter().find(|p| p.is_provisional()) {
                return Some(format!("person {p} (in village {})", v.id));
            }
        }
        None
    }
}
