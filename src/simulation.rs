use crate::config::EngineConfig;
use crate::db::DurableStore;
use crate::engine::{Broadcaster, SimulationEngine, TickDriver, TickResult};
use crate::error::ReconcileError;
use crate::id::IdAllocator;
use crate::reconcile::{ReconcileSummary, reconcile};
use crate::restart::{RestartOptions, RestartResult, restart_world};
use crate::store::{PopulationSnapshot, PopulationStore};
use crate::tick::{RestartFlag, TickOutcome, handle_tick};

/// Everything one running world owns: the working store, the id allocator
/// over the durable store's counters, and the external collaborators.
pub struct Simulation<D, E, T, B> {
    pub config: EngineConfig,
    pub store: PopulationStore,
    pub allocator: IdAllocator<D>,
    pub durable: D,
    pub engine: E,
    pub driver: T,
    pub broadcaster: B,
    restart_flag: RestartFlag,
}

impl<D, E, T, B> Simulation<D, E, T, B>
where
    D: DurableStore + Clone,
    E: SimulationEngine,
    T: TickDriver,
    B: Broadcaster,
{
    pub fn new(config: EngineConfig, durable: D, engine: E, driver: T, broadcaster: B) -> Self {
        let allocator = IdAllocator::new(durable.clone(), config.allocator.block_size);
        let mut store = PopulationStore::new(config.rules.clone());
        store.set_current_date(driver.current_date());
        Self {
            config,
            store,
            allocator,
            durable,
            engine,
            driver,
            broadcaster,
            restart_flag: RestartFlag::default(),
        }
    }

    /// Handle to the flag that suppresses ticks during a restart.
    pub fn restart_flag(&self) -> RestartFlag {
        self.restart_flag.clone()
    }

    pub async fn restart(&mut self, options: RestartOptions) -> RestartResult {
        restart_world(self, options).await
    }

    pub async fn reconcile(&mut self) -> Result<ReconcileSummary, ReconcileError> {
        reconcile(&mut self.store, &mut self.allocator, &self.durable).await
    }

    /// Tick callback. Broadcasts a population snapshot after every applied
    /// tick.
    pub fn on_tick(&mut self, days_advanced: u32, result: &TickResult) -> TickOutcome {
        let outcome = handle_tick(
            &mut self.store,
            &self.restart_flag,
            days_advanced,
            result,
            &self.config.food,
        );
        if matches!(outcome, TickOutcome::Applied { .. }) {
            self.broadcaster.population(&self.store.snapshot());
        }
        outcome
    }

    pub fn snapshot(&self) -> PopulationSnapshot {
        self.store.snapshot()
    }
}
