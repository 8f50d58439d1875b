use crate::error::RecordError;
use crate::model::{EntityKind, GameDate, PersonId, PersonUpdate, TileId, Village, VillageId};

use super::PopulationStore;

impl PopulationStore {
    /// Insert a village on a free plot of a known tile. Listed occupants must
    /// already be resident on that plot.
    pub fn add_village(&mut self, village: Village, is_new: bool) -> Result<(), RecordError> {
        if self.villages.contains_key(&village.id) {
            return Err(RecordError::DuplicateVillage(village.id));
        }
        self.check_tile(village.tile_id)?;
        village.validate().map_err(RecordError::Invalid)?;
        let plot = (village.tile_id, village.land_chunk);
        if let Some(existing) = self.plots.get(&plot) {
            return Err(RecordError::Invalid(format!(
                "plot {}:{} already holds village {existing}",
                plot.0, plot.1
            )));
        }
        let resident = self.residents.get(&plot);
        if let Some(stray) = village
            .occupants
            .iter()
            .find(|id| !resident.is_some_and(|set| set.contains(id)))
        {
            return Err(RecordError::Invalid(format!(
                "{stray} is not resident on plot {}:{}",
                plot.0, plot.1
            )));
        }
        if is_new {
            self.pending.inserts.villages.insert(village.id);
        }
        self.note_provisional(EntityKind::Village, village.id.0);
        self.plots.insert(plot, village.id);
        self.villages.insert(village.id, village);
        Ok(())
    }

    pub fn get_village(&self, id: VillageId) -> Option<&Village> {
        self.villages.get(&id)
    }

    pub fn villages(&self) -> impl Iterator<Item = &Village> + '_ {
        self.villages.values()
    }

    pub fn village_count(&self) -> usize {
        self.villages.len()
    }

    pub fn village_at(&self, tile: TileId, chunk: u32) -> Option<&Village> {
        self.plots
            .get(&(tile, chunk))
            .and_then(|id| self.villages.get(id))
    }

    /// Villages on one tile, by land chunk.
    pub fn villages_on_tile(&self, tile: TileId) -> impl Iterator<Item = &Village> + '_ {
        self.plots
            .range((tile, 0)..=(tile, u32::MAX))
            .filter_map(|(_, id)| self.villages.get(id))
    }

    /// House a person in a village, moving them to its tile if needed.
    pub fn assign_residency(
        &mut self,
        person: PersonId,
        village: VillageId,
        current: GameDate,
    ) -> Result<(), RecordError> {
        let (tile, chunk) = {
            let v = self
                .villages
                .get(&village)
                .ok_or(RecordError::VillageNotFound(village))?;
            (v.tile_id, v.land_chunk)
        };
        let update = PersonUpdate {
            tile_id: Some(tile),
            residency: Some(Some(chunk)),
            ..PersonUpdate::default()
        };
        self.update_person(person, update, current)?;
        Ok(())
    }

    /// Overwrite a village's food state. Stores must lie within capacity.
    pub fn set_village_food(
        &mut self,
        id: VillageId,
        stores: f64,
        production_rate: f64,
    ) -> Result<(), RecordError> {
        let village = self
            .villages
            .get_mut(&id)
            .ok_or(RecordError::VillageNotFound(id))?;
        if !(0.0..=village.food_capacity).contains(&stores) {
            return Err(RecordError::Invalid(format!(
                "village {id} food stores {stores} outside 0..={}",
                village.food_capacity
            )));
        }
        village.food_stores = stores;
        village.food_production_rate = production_rate;
        self.pending.mark_village_updated(id);
        Ok(())
    }

    /// Remove a village. Its residents keep their tile but lose residency.
    pub fn remove_village(
        &mut self,
        id: VillageId,
        track: bool,
        current: GameDate,
    ) -> Option<Village> {
        let village = self.villages.get(&id)?.clone();
        for occupant in &village.occupants {
            let _ = self.update_person(*occupant, clear_residency(), current);
        }
        self.plots.remove(&(village.tile_id, village.land_chunk));
        self.pending.forget_village(id, track);
        self.villages.remove(&id)
    }
}

fn clear_residency() -> PersonUpdate {
    PersonUpdate {
        residency: Some(None),
        ..PersonUpdate::default()
    }
}
