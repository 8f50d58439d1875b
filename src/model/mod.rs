#[macro_use]
mod macros;

pub mod date;
pub mod family;
pub mod ids;
pub mod person;
pub mod tile;
pub mod village;

pub use date::{DAYS_PER_MONTH, DAYS_PER_YEAR, EPOCH_YEAR, GameDate, MONTHS_PER_YEAR};
pub use family::{Family, FamilyUpdate};
pub use ids::{EntityKind, FamilyId, PersonId, RecordId, TileId, VillageId};
pub use person::{FULL_HEALTH, Person, PersonUpdate, Sex};
pub use tile::{Biome, TerrainType, Tile, is_habitable};
pub use village::Village;
