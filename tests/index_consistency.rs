mod common;

use gridworld::config::DemographicRules;
use gridworld::error::RecordError;
use gridworld::model::{FamilyId, GameDate, PersonId, PersonUpdate, Sex};
use gridworld::store::{PopulationStore, eligible_key};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use common::{assert_eligible_consistent, person_aged};

fn store() -> PopulationStore {
    PopulationStore::new(DemographicRules::default())
}

fn assert_fertile_consistent(store: &PopulationStore, current: GameDate) {
    let rules = store.rules();
    for family in store.families() {
        let expected = !family.pregnant
            && family.children.len() < rules.max_children
            && family
                .wife_id
                .and_then(|wife| store.get_person(wife))
                .is_some_and(|wife| rules.fertile_wife.contains(&wife.age_on(current)));
        assert_eq!(store.is_fertile(family.id), expected, "fertility of {}", family.id);
    }
}

#[test]
fn eligibility_follows_family_assignment_and_release() {
    let today = GameDate::EPOCH;
    let mut store = store();
    let man = person_aged(1, 7, Sex::Male, 20, today);
    let woman = person_aged(2, 7, Sex::Female, 20, today);
    let (m, w) = (man.id, woman.id);
    store.add_person(man, true).unwrap();
    store.add_person(woman, true).unwrap();
    store.add_eligible_person(m, today);

    assert_eq!(eligible_key(Sex::Male, 7), "eligible:males:tile:7");
    assert!(store.eligible().contains(Sex::Male, 7, m));

    let family = store.form_family(m, w, today).unwrap();
    assert!(!store.eligible().contains(Sex::Male, 7, m));

    store
        .update_person(m, PersonUpdate::leave_family(), today)
        .unwrap();
    assert!(store.eligible().contains(Sex::Male, 7, m));

    // The vacated slot is gone, so rejoining is refused and nothing changes.
    let err = store
        .update_person(m, PersonUpdate::join_family(family), today)
        .unwrap_err();
    assert!(matches!(err, RecordError::Invalid(_)));
    assert_eq!(store.get_person(m).unwrap().family_id, None);
    assert!(store.eligible().contains(Sex::Male, 7, m));
    assert_eligible_consistent(&store, today);
}

#[test]
fn unknown_tile_removal_scans_every_set() {
    let today = GameDate::EPOCH;
    let mut store = store();
    let person = person_aged(1, 3, Sex::Female, 19, today);
    let id = person.id;
    store.add_person(person, false).unwrap();
    store.add_eligible_person(id, today);

    assert!(store.remove_eligible_person(id, None, None));
    assert!(store.eligible().locate(id).is_empty());
    assert!(!store.remove_eligible_person(id, None, Some(Sex::Female)));
}

/// Random operation sequences must never leave the eligible or fertile
/// indices out of step with the records.
#[test]
fn indices_survive_random_operation_sequences() {
    for seed in 0..8u64 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut store = store();
        let mut today = GameDate::EPOCH;
        let mut next_id = 1u64;

        for _ in 0..400 {
            let people: Vec<PersonId> = store.people().map(|p| p.id).collect();
            let families: Vec<FamilyId> = store.families().map(|f| f.id).collect();
            match rng.random_range(0..9) {
                0 | 1 => {
                    let sex = Sex::from_bool(rng.random_bool(0.5));
                    let age = rng.random_range(0..60);
                    let tile = rng.random_range(0..6);
                    let person = person_aged(next_id, tile, sex, age, today);
                    next_id += 1;
                    let id = person.id;
                    store.add_person(person, true).unwrap();
                    store.add_eligible_person(id, today);
                }
                2 => {
                    if let Some(&id) = people.choose(&mut rng) {
                        let tile = rng.random_range(0..6);
                        store
                            .update_person(id, PersonUpdate::move_to(tile), today)
                            .unwrap();
                    }
                }
                3 => {
                    let singles: Vec<_> = store
                        .people()
                        .filter(|p| p.family_id.is_none())
                        .map(|p| (p.id, p.sex))
                        .collect();
                    let men: Vec<_> = singles.iter().filter(|(_, s)| *s == Sex::Male).collect();
                    let women: Vec<_> = singles.iter().filter(|(_, s)| *s == Sex::Female).collect();
                    if let (Some(h), Some(w)) = (men.choose(&mut rng), women.choose(&mut rng)) {
                        store.form_family(h.0, w.0, today).unwrap();
                    }
                }
                4 => {
                    if let Some(&id) = families.choose(&mut rng) {
                        store.dissolve_family(id, today).unwrap();
                    }
                }
                5 => {
                    if let Some(&id) = people.choose(&mut rng) {
                        store.remove_person(id, rng.random_bool(0.5));
                    }
                }
                6 => {
                    if let Some(&id) = families.choose(&mut rng) {
                        let family = store.get_family(id).unwrap();
                        if family.pregnant {
                            let sex = Sex::from_bool(rng.random_bool(0.5));
                            store.record_birth(id, sex, today).unwrap();
                        } else if family.wife_id.is_some() {
                            store
                                .begin_pregnancy(id, today.add_days(30), today)
                                .unwrap();
                        }
                    }
                }
                7 => {
                    if let Some(&id) = people.choose(&mut rng) {
                        let person = store.get_person(id).unwrap();
                        let update = match person.family_id {
                            Some(_) => PersonUpdate::leave_family(),
                            None => {
                                let listing: Vec<_> = store
                                    .families()
                                    .filter(|f| f.lists(id))
                                    .map(|f| f.id)
                                    .collect();
                                match listing.choose(&mut rng) {
                                    Some(&family) => PersonUpdate::join_family(family),
                                    None => continue,
                                }
                            }
                        };
                        store.update_person(id, update, today).unwrap();
                    }
                }
                _ => {
                    let previous = today;
                    today = today.add_days(rng.random_range(1..200));
                    store.set_current_date(today);
                    store.refresh_birthdays(previous, today);
                }
            }
            assert_eligible_consistent(&store, today);
            assert_fertile_consistent(&store, today);
        }
    }
}

#[test]
fn rebuilt_indices_match_incremental_ones() {
    let today = GameDate::EPOCH;
    let mut store = store();
    for id in 1..=30u64 {
        let sex = if id % 2 == 0 { Sex::Male } else { Sex::Female };
        let person = person_aged(id, (id % 4) as u32, sex, (id * 2) as i32, today);
        store.add_person(person, false).unwrap();
        store.add_eligible_person(PersonId::persisted(id), today);
    }
    store
        .form_family(PersonId::persisted(10), PersonId::persisted(9), today)
        .unwrap();

    let before = store.eligible().clone();
    store.rebuild_indices(today);
    assert_eq!(store.eligible(), &before);
    assert_eligible_consistent(&store, today);
}
