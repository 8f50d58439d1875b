use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a working-store record.
///
/// Records created by simulation events start out `Provisional` with a
/// process-local number. Reconciliation replaces them with a `Persisted` id
/// handed out by the durable store's sequence counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordId {
    Provisional(u64),
    Persisted(u64),
}

impl RecordId {
    pub fn is_provisional(self) -> bool {
        matches!(self, RecordId::Provisional(_))
    }

    pub fn durable(self) -> Option<u64> {
        match self {
            RecordId::Persisted(id) => Some(id),
            RecordId::Provisional(_) => None,
        }
    }

    /// Signed wire form: durable ids are positive, provisional ids negative.
    pub fn to_signed(self) -> i64 {
        match self {
            RecordId::Persisted(id) => id as i64,
            RecordId::Provisional(local) => -(local as i64),
        }
    }

    /// Inverse of [`RecordId::to_signed`]. Zero is not a valid id.
    pub fn from_signed(value: i64) -> Option<Self> {
        match value {
            0 => None,
            v if v > 0 => Some(RecordId::Persisted(v as u64)),
            v => Some(RecordId::Provisional(v.unsigned_abs())),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_signed())
    }
}

record_id!(
    /// Identifier of a [`Person`](super::Person).
    PersonId
);
record_id!(
    /// Identifier of a [`Family`](super::Family).
    FamilyId
);
record_id!(
    /// Identifier of a [`Village`](super::Village).
    VillageId
);

/// Tiles are regenerated wholesale from the topology, so their ids are plain
/// topology indices and never provisional.
pub type TileId = u32;

/// Entity kinds that own a durable sequence counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EntityKind {
    Person,
    Family,
    Village,
}

string_enum!(EntityKind {
    Person => "person",
    Family => "family",
    Village => "village",
});

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Person, EntityKind::Family, EntityKind::Village];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_form_round_trips() {
        for id in [RecordId::Persisted(17), RecordId::Provisional(3)] {
            assert_eq!(RecordId::from_signed(id.to_signed()), Some(id));
        }
        assert_eq!(RecordId::Provisional(3).to_signed(), -3);
        assert_eq!(RecordId::from_signed(0), None);
    }

    #[test]
    fn typed_ids_expose_durable_identity() {
        let p = PersonId::persisted(9);
        assert_eq!(p.durable(), Some(9));
        assert!(!p.is_provisional());

        let f = FamilyId::provisional(2);
        assert_eq!(f.durable(), None);
        assert!(f.is_provisional());
        assert_eq!(f.to_string(), "-2");
    }

    #[test]
    fn entity_kind_serializes_as_string() {
        let json = serde_json::to_string(&EntityKind::Village).unwrap();
        assert_eq!(json, "\"village\"");
        let back: EntityKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EntityKind::Village);
    }
}
