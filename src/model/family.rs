use serde::{Deserialize, Serialize};

use super::{FamilyId, GameDate, PersonId, TileId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub husband_id: Option<PersonId>,
    pub wife_id: Option<PersonId>,
    pub tile_id: TileId,
    pub pregnant: bool,
    pub delivery_date: Option<GameDate>,
    pub children: Vec<PersonId>,
}

impl Family {
    pub fn new(id: FamilyId, husband_id: PersonId, wife_id: PersonId, tile_id: TileId) -> Self {
        Self {
            id,
            husband_id: Some(husband_id),
            wife_id: Some(wife_id),
            tile_id,
            pregnant: false,
            delivery_date: None,
            children: Vec::new(),
        }
    }

    /// Whether `person` appears as a spouse or child.
    pub fn lists(&self, person: PersonId) -> bool {
        self.husband_id == Some(person)
            || self.wife_id == Some(person)
            || self.children.contains(&person)
    }

    /// Every person referenced by this family.
    pub fn members(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.husband_id
            .into_iter()
            .chain(self.wife_id)
            .chain(self.children.iter().copied())
    }

    /// A pregnancy requires a wife and a delivery date.
    pub fn validate(&self) -> Result<(), String> {
        if self.pregnant && self.wife_id.is_none() {
            return Err(format!("family {} is pregnant without a wife", self.id));
        }
        if self.pregnant && self.delivery_date.is_none() {
            return Err(format!(
                "family {} is pregnant without a delivery date",
                self.id
            ));
        }
        Ok(())
    }
}

/// Partial update for [`Family`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FamilyUpdate {
    pub husband_id: Option<Option<PersonId>>,
    pub wife_id: Option<Option<PersonId>>,
    pub pregnant: Option<bool>,
    pub delivery_date: Option<Option<GameDate>>,
    pub children: Option<Vec<PersonId>>,
}
