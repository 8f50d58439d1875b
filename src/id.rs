use std::collections::BTreeMap;

use tracing::debug;

use crate::db::SequenceCounter;
use crate::error::AllocationError;
use crate::model::EntityKind;

/// Value of every durable counter after a world restart. The first id handed
/// out is `SEED_ORIGIN + 1`.
pub const SEED_ORIGIN: u64 = 0;

/// Half-open range `[next, max)` of ids already reserved from the durable counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdWindow {
    pub next: u64,
    pub max: u64,
}

impl IdWindow {
    pub fn remaining(&self) -> u64 {
        self.max - self.next
    }
}

/// Hands out durable ids per entity kind from in-memory windows, refilling
/// them in blocks with a single fetch-and-add on the durable counter.
///
/// Ids only ever move forward; a window abandoned by [`IdAllocator::reserve_block`]
/// is never revisited.
#[derive(Debug)]
pub struct IdAllocator<C> {
    counter: C,
    block_size: u64,
    windows: BTreeMap<EntityKind, IdWindow>,
}

impl<C: SequenceCounter> IdAllocator<C> {
    pub fn new(counter: C, block_size: u64) -> Self {
        Self {
            counter,
            block_size: block_size.max(1),
            windows: BTreeMap::new(),
        }
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    pub fn window(&self, kind: EntityKind) -> Option<IdWindow> {
        self.windows.get(&kind).copied()
    }

    /// Reserve at least `min_count` ids as the new window for `kind` and
    /// return the first of them.
    pub async fn reserve_block(
        &mut self,
        kind: EntityKind,
        min_count: u64,
    ) -> Result<u64, AllocationError> {
        let count = self.block_size.max(min_count);
        let end = self
            .counter
            .advance(kind, count)
            .await
            .map_err(|source| AllocationError::Counter { kind, source })?;
        if end < count {
            return Err(AllocationError::InvalidRange { kind, end, count });
        }
        let first = end - count + 1;
        self.windows.insert(
            kind,
            IdWindow {
                next: first,
                max: end + 1,
            },
        );
        debug!(%kind, first, last = end, "reserved id block");
        Ok(first)
    }

    pub async fn next_id(&mut self, kind: EntityKind) -> Result<u64, AllocationError> {
        let needs_refill = self.window(kind).is_none_or(|w| w.remaining() == 0);
        if needs_refill {
            self.reserve_block(kind, 1).await?;
        }
        let window = self
            .windows
            .get_mut(&kind)
            .ok_or(AllocationError::InvalidRange {
                kind,
                end: 0,
                count: 1,
            })?;
        let id = window.next;
        window.next += 1;
        Ok(id)
    }

    /// `count` strictly increasing ids. Drains the current window first, then
    /// reserves one block large enough for the rest.
    pub async fn id_batch(
        &mut self,
        kind: EntityKind,
        count: usize,
    ) -> Result<Vec<u64>, AllocationError> {
        let mut ids = Vec::with_capacity(count);
        let wanted = count as u64;

        if let Some(window) = self.windows.get_mut(&kind) {
            let take = window.remaining().min(wanted);
            ids.extend(window.next..window.next + take);
            window.next += take;
        }

        let missing = wanted - ids.len() as u64;
        if missing > 0 {
            let first = self.reserve_block(kind, missing).await?;
            ids.extend(first..first + missing);
            if let Some(window) = self.windows.get_mut(&kind) {
                window.next = first + missing;
            }
        }
        Ok(ids)
    }

    /// Rewind every durable counter to [`SEED_ORIGIN`] and drop local windows.
    pub async fn reset(&mut self) -> Result<(), AllocationError> {
        self.windows.clear();
        for kind in EntityKind::ALL {
            self.counter
                .reset(kind, SEED_ORIGIN)
                .await
                .map_err(|source| AllocationError::Counter { kind, source })?;
        }
        Ok(())
    }
}
