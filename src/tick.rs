use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{trace, warn};

use crate::config::FoodConfig;
use crate::engine::TickResult;
use crate::food::{FoodTickSummary, apply_food_tick};
use crate::model::GameDate;
use crate::store::{PopulationStore, VitalTotals};

/// Shared "a restart is in progress" flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct RestartFlag(Arc<AtomicBool>);

impl RestartFlag {
    pub fn is_restarting(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the flag, or return `None` if it is already raised.
    pub fn try_begin(&self) -> Option<RestartGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RestartGuard(Arc::clone(&self.0)))
    }
}

/// Lowers the restart flag when dropped, including on early return.
#[derive(Debug)]
pub struct RestartGuard(Arc<AtomicBool>);

impl Drop for RestartGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Dropped because a restart held the flag.
    Suppressed,
    Applied { date: GameDate, food: FoodTickSummary },
}

/// Tick callback: advance the store's date, fold in vital events, re-derive
/// age-gated indices and run the village food model.
pub fn handle_tick(
    store: &mut PopulationStore,
    flag: &RestartFlag,
    days_advanced: u32,
    result: &TickResult,
    food: &FoodConfig,
) -> TickOutcome {
    if flag.is_restarting() {
        warn!(days_advanced, "tick suppressed during world restart");
        return TickOutcome::Suppressed;
    }
    let previous = store.current_date();
    let date = previous.add_days(days_advanced);
    store.set_current_date(date);
    store.record_vitals(&VitalTotals::from(result));
    if days_advanced > 0 {
        // O(people) age checks per tick; only birthdays touch the indices.
        store.refresh_birthdays(previous, date);
    }
    let food = apply_food_tick(store, food);
    trace!(%date, "tick applied");
    TickOutcome::Applied { date, food }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemographicRules;
    use crate::model::{Person, PersonId, Sex};

    #[test]
    fn guard_is_exclusive_and_released_on_drop() {
        let flag = RestartFlag::default();
        let guard = flag.try_begin().unwrap();
        assert!(flag.is_restarting());
        assert!(flag.clone().try_begin().is_none());
        drop(guard);
        assert!(!flag.is_restarting());
        assert!(flag.try_begin().is_some());
    }

    #[test]
    fn ticks_are_suppressed_while_restarting() {
        let mut store = PopulationStore::new(DemographicRules::default());
        let flag = RestartFlag::default();
        let _guard = flag.try_begin().unwrap();
        let outcome = handle_tick(
            &mut store,
            &flag,
            1,
            &TickResult { births: 3, ..TickResult::default() },
            &FoodConfig::default(),
        );
        assert_eq!(outcome, TickOutcome::Suppressed);
        assert_eq!(store.current_date(), GameDate::EPOCH);
        assert_eq!(store.vitals().births, 0);
    }

    #[test]
    fn tick_advances_date_and_vitals() {
        let mut store = PopulationStore::new(DemographicRules::default());
        let flag = RestartFlag::default();
        let result = TickResult {
            births: 2,
            deaths: 1,
            ..TickResult::default()
        };
        handle_tick(&mut store, &flag, 8, &result, &FoodConfig::default());
        handle_tick(&mut store, &flag, 8, &result, &FoodConfig::default());
        assert_eq!(store.current_date(), GameDate::new(4000, 3, 1));
        assert_eq!(store.vitals().births, 4);
        assert_eq!(store.vitals().deaths, 2);
    }

    #[test]
    fn aging_past_the_band_leaves_the_eligible_set() {
        let mut store = PopulationStore::new(DemographicRules::default());
        // Turns 31 on 4000-01-02, past the female band.
        let id = PersonId::persisted(1);
        store
            .add_person(Person::new(id, 3, Sex::Female, GameDate::new(3969, 1, 2)), false)
            .unwrap();
        assert!(store.add_eligible_person(id, GameDate::EPOCH));

        let flag = RestartFlag::default();
        handle_tick(&mut store, &flag, 1, &TickResult::default(), &FoodConfig::default());
        assert!(!store.eligible().contains(Sex::Female, 3, id));
    }

    #[test]
    fn birthdays_touch_only_people_who_aged() {
        let mut store = PopulationStore::new(DemographicRules::default());
        let turning_16 = PersonId::persisted(1);
        let steady = PersonId::persisted(2);
        let wife = PersonId::persisted(3);
        let husband = PersonId::persisted(4);
        store
            .add_person(Person::new(turning_16, 1, Sex::Male, GameDate::new(3984, 1, 5)), false)
            .unwrap();
        store
            .add_person(Person::new(steady, 1, Sex::Female, GameDate::new(3980, 6, 1)), false)
            .unwrap();
        // Wife turns 34 on 4000-01-03, leaving the fertile band.
        store
            .add_person(Person::new(wife, 1, Sex::Female, GameDate::new(3966, 1, 3)), false)
            .unwrap();
        store
            .add_person(Person::new(husband, 1, Sex::Male, GameDate::new(3966, 1, 1)), false)
            .unwrap();
        store.refresh_age_gated(GameDate::EPOCH);
        let family = store.form_family(husband, wife, GameDate::EPOCH).unwrap();
        assert!(store.is_fertile(family));
        assert!(!store.eligible().contains(Sex::Male, 1, turning_16));

        let flag = RestartFlag::default();
        handle_tick(&mut store, &flag, 4, &TickResult::default(), &FoodConfig::default());
        let today = store.current_date();
        assert!(store.eligible().contains(Sex::Male, 1, turning_16));
        assert!(store.eligible().contains(Sex::Female, 1, steady));
        assert!(!store.is_fertile(family));

        let mut rebuilt = store.clone();
        rebuilt.refresh_age_gated(today);
        assert_eq!(rebuilt.eligible(), store.eligible());
        assert_eq!(
            rebuilt.fertile_families().collect::<Vec<_>>(),
            store.fertile_families().collect::<Vec<_>>()
        );
    }
}
