use std::collections::{BTreeMap, BTreeSet};

use crate::model::{PersonId, Sex, TileId};

/// Per-tile, per-sex sets of people available for matchmaking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibleIndex {
    sets: BTreeMap<(Sex, TileId), BTreeSet<PersonId>>,
}

/// Display name of an eligible set, e.g. `eligible:males:tile:7`.
pub fn eligible_key(sex: Sex, tile: TileId) -> String {
    format!("eligible:{}:tile:{tile}", sex.plural())
}

impl EligibleIndex {
    pub fn insert(&mut self, sex: Sex, tile: TileId, id: PersonId) -> bool {
        self.sets.entry((sex, tile)).or_default().insert(id)
    }

    pub fn contains(&self, sex: Sex, tile: TileId, id: PersonId) -> bool {
        self.sets
            .get(&(sex, tile))
            .is_some_and(|set| set.contains(&id))
    }

    pub fn members(&self, sex: Sex, tile: TileId) -> impl Iterator<Item = PersonId> + '_ {
        self.sets
            .get(&(sex, tile))
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn count(&self, sex: Sex, tile: TileId) -> usize {
        self.sets.get(&(sex, tile)).map_or(0, BTreeSet::len)
    }

    pub fn len(&self) -> usize {
        self.sets.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Every `(sex, tile)` set that holds `id`.
    pub fn locate(&self, id: PersonId) -> Vec<(Sex, TileId)> {
        self.sets
            .iter()
            .filter(|(_, set)| set.contains(&id))
            .map(|(key, _)| *key)
            .collect()
    }

    fn remove_from(&mut self, key: (Sex, TileId), id: PersonId) -> bool {
        let Some(set) = self.sets.get_mut(&key) else {
            return false;
        };
        let removed = set.remove(&id);
        if set.is_empty() {
            self.sets.remove(&key);
        }
        removed
    }

    /// Remove `id` from the set for a known tile and sex, or, when either is
    /// unknown, from every tile's set (of that sex, if known).
    ///
    /// The fallback is linear in the number of tiles holding eligible people.
    pub fn remove(&mut self, id: PersonId, tile: Option<TileId>, sex: Option<Sex>) -> bool {
        if let (Some(tile), Some(sex)) = (tile, sex) {
            return self.remove_from((sex, tile), id);
        }
        let keys: Vec<(Sex, TileId)> = self
            .sets
            .keys()
            .filter(|(s, t)| sex.is_none_or(|want| want == *s) && tile.is_none_or(|want| want == *t))
            .copied()
            .collect();
        let mut removed = false;
        for key in keys {
            removed |= self.remove_from(key, id);
        }
        removed
    }

    /// Replace `old` with `new` wherever it appears.
    pub fn rekey(&mut self, old: PersonId, new: PersonId) {
        for set in self.sets.values_mut() {
            if set.remove(&old) {
                set.insert(new);
            }
        }
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }
}
