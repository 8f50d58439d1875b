use serde::Serialize;

use crate::store::PopulationStore;

/// Post-restart consistency report. Issues are warnings, not failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// Cross-check people against tile habitability and villages against their
/// bounds.
pub fn verify_integrity(store: &PopulationStore) -> IntegrityReport {
    let mut issues = Vec::new();
    for person in store.people() {
        match store.tile(person.tile_id) {
            None => issues.push(format!("{} is on unknown tile {}", person.id, person.tile_id)),
            Some(tile) if !tile.habitable => issues.push(format!(
                "{} is on uninhabitable tile {} ({})",
                person.id, tile.id, tile.terrain
            )),
            Some(_) => {}
        }
    }
    for village in store.villages() {
        if let Err(problem) = village.validate() {
            issues.push(problem);
        }
        if store.tile(village.tile_id).is_none() {
            issues.push(format!(
                "village {} is on unknown tile {}",
                village.id, village.tile_id
            ));
        }
    }
    IntegrityReport {
        valid: issues.is_empty(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemographicRules;
    use crate::model::{GameDate, Person, PersonId, Sex, TerrainType, Tile};

    fn tile(id: u32, habitable: bool) -> Tile {
        Tile {
            id,
            center: [1.0, 0.0, 0.0],
            latitude: 0.0,
            longitude: 0.0,
            terrain: if habitable {
                TerrainType::Flats
            } else {
                TerrainType::Ocean
            },
            biome: None,
            fertility: 0,
            habitable,
            boundary: Vec::new(),
            neighbors: Vec::new(),
        }
    }

    #[test]
    fn people_on_water_are_reported() {
        let mut store = PopulationStore::new(DemographicRules::default());
        store.set_tiles([tile(0, true), tile(1, false), tile(9, true)]);
        store
            .add_person(Person::new(PersonId::persisted(1), 0, Sex::Male, GameDate::EPOCH), false)
            .unwrap();
        assert!(verify_integrity(&store).valid);

        store
            .add_person(Person::new(PersonId::persisted(2), 1, Sex::Male, GameDate::EPOCH), false)
            .unwrap();
        store
            .add_person(Person::new(PersonId::persisted(3), 9, Sex::Male, GameDate::EPOCH), false)
            .unwrap();
        // Regenerated with fewer tiles under existing people.
        store.set_tiles([tile(0, true), tile(1, false)]);
        let report = verify_integrity(&store);
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 2);
        assert!(report.issues[0].contains("uninhabitable tile 1"), "{:?}", report.issues);
        assert!(report.issues[1].contains("unknown tile 9"), "{:?}", report.issues);
    }
}
