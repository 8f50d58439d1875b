use serde::{Deserialize, Serialize};

use super::{FamilyId, GameDate, PersonId, TileId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Durable-store encoding: `true` is male.
    pub fn as_bool(self) -> bool {
        self == Sex::Male
    }

    pub fn from_bool(male: bool) -> Self {
        if male { Sex::Male } else { Sex::Female }
    }

    /// Plural label used when naming index keys.
    pub fn plural(self) -> &'static str {
        match self {
            Sex::Male => "males",
            Sex::Female => "females",
        }
    }
}

pub const FULL_HEALTH: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub tile_id: TileId,
    /// Land chunk of the village the person lives in, if assigned.
    pub residency: Option<u32>,
    pub sex: Sex,
    pub date_of_birth: GameDate,
    pub family_id: Option<FamilyId>,
    pub health: u8,
}

impl Person {
    pub fn new(id: PersonId, tile_id: TileId, sex: Sex, date_of_birth: GameDate) -> Self {
        Self {
            id,
            tile_id,
            residency: None,
            sex,
            date_of_birth,
            family_id: None,
            health: FULL_HEALTH,
        }
    }

    pub fn age_on(&self, current: GameDate) -> i32 {
        self.date_of_birth.age_on(current)
    }
}

/// Partial update for [`Person`]. `None` leaves a field untouched; the
/// nested options set or clear nullable fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonUpdate {
    pub tile_id: Option<TileId>,
    pub residency: Option<Option<u32>>,
    pub family_id: Option<Option<FamilyId>>,
    pub health: Option<u8>,
}

impl PersonUpdate {
    pub fn move_to(tile_id: TileId) -> Self {
        Self {
            tile_id: Some(tile_id),
            residency: Some(None),
            ..Self::default()
        }
    }

    pub fn join_family(family_id: FamilyId) -> Self {
        Self {
            family_id: Some(Some(family_id)),
            ..Self::default()
        }
    }

    pub fn leave_family() -> Self {
        Self {
            family_id: Some(None),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
