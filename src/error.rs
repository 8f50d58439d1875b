use thiserror::Error;

use crate::model::{EntityKind, FamilyId, PersonId, TileId, VillageId};

/// Invalid restart or generation parameters. Raised before any destructive step.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("tile topology is empty")]
    EmptyTopology,
    #[error("sphere radius must be positive and finite, got {0}")]
    InvalidRadius(f64),
    #[error("population range is inverted: min {min} > max {max}")]
    InvalidPopulationRange { min: usize, max: usize },
    #[error("tile percent must be within 1..=100, got {0}")]
    InvalidTilePercent(u32),
    #[error("explicit tile count must be positive")]
    ZeroTileCount,
    #[error("seeded age range is inverted: min {min} > max {max}")]
    InvalidAgeRange { min: u32, max: u32 },
}

/// Durable store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("no sequence counter for {0}")]
    MissingCounter(EntityKind),
    #[error("record {0} still carries a provisional id")]
    ProvisionalId(String),
    #[error("durable store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("failed to advance {kind} counter: {source}")]
    Counter {
        kind: EntityKind,
        #[source]
        source: StoreError,
    },
    #[error("{kind} counter returned an invalid range ending at {end} for {count} ids")]
    InvalidRange {
        kind: EntityKind,
        end: u64,
        count: u64,
    },
}

/// Violations detected at the working-store boundary.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("person {0} not found")]
    PersonNotFound(PersonId),
    #[error("family {0} not found")]
    FamilyNotFound(FamilyId),
    #[error("village {0} not found")]
    VillageNotFound(VillageId),
    #[error("tile {0} is not part of the world")]
    UnknownTile(TileId),
    #[error("person {0} already exists")]
    DuplicatePerson(PersonId),
    #[error("family {0} already exists")]
    DuplicateFamily(FamilyId),
    #[error("village {0} already exists")]
    DuplicateVillage(VillageId),
    #[error("village {0} is full")]
    VillageFull(VillageId),
    #[error("invalid record: {0}")]
    Invalid(String),
}

/// Reconciliation failures. Pending sets are untouched whenever one is returned.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("persisting batch failed: {0}")]
    Persist(#[source] StoreError),
    #[error("batch references {0}, which is neither persisted nor pending insert")]
    DanglingReference(String),
}

#[derive(Debug, Error)]
pub enum RestartError {
    #[error("a world restart is already in progress")]
    AlreadyRestarting,
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Failures loading an exported world.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{file}:{line}: {source}")]
    Json {
        file: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Record(#[from] RecordError),
}
