use serde::{Deserialize, Serialize};

use super::{PersonId, TileId, VillageId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Village {
    pub id: VillageId,
    pub tile_id: TileId,
    pub land_chunk: u32,
    pub cleared_chunks: u32,
    pub housing_capacity: u32,
    pub occupants: Vec<PersonId>,
    pub food_stores: f64,
    pub food_capacity: f64,
    pub food_production_rate: f64,
}

impl Village {
    pub fn has_room(&self) -> bool {
        (self.occupants.len() as u32) < self.housing_capacity
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.occupants.len() as u32 > self.housing_capacity {
            return Err(format!(
                "village {} houses {} people over capacity {}",
                self.id,
                self.occupants.len(),
                self.housing_capacity
            ));
        }
        if self.food_stores > self.food_capacity {
            return Err(format!(
                "village {} stores {} food over capacity {}",
                self.id, self.food_stores, self.food_capacity
            ));
        }
        if self.food_stores < 0.0 {
            return Err(format!("village {} has negative food stores", self.id));
        }
        Ok(())
    }
}
