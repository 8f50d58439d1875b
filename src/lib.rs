pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod flush;
pub mod food;
pub mod id;
pub mod model;
pub mod reconcile;
pub mod restart;
pub mod simulation;
pub mod store;
pub mod tick;
pub mod worldgen;

pub use config::EngineConfig;
pub use id::IdAllocator;
pub use model::{
    EntityKind, Family, FamilyId, GameDate, Person, PersonId, RecordId, Sex, Tile, TileId,
    Village, VillageId,
};
pub use reconcile::{ReconcileSummary, reconcile};
pub use restart::{RestartOptions, RestartResult};
pub use simulation::Simulation;
pub use store::PopulationStore;
pub use worldgen::derive_tile_properties;
