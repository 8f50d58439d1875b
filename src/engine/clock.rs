use crate::model::GameDate;

use super::TickDriver;

/// Calendar owned by a tick driver.
///
/// `advance` moves the date forward by whole days while running; a paused
/// clock ignores advances.
#[derive(Debug, Clone)]
pub struct SimClock {
    pub date: GameDate,
    pub tick_count: u64,
    running: bool,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(GameDate::EPOCH)
    }
}

impl SimClock {
    pub fn new(date: GameDate) -> Self {
        Self {
            date,
            tick_count: 0,
            running: true,
        }
    }

    /// Advance by `days`. Returns the new date, or `None` while paused.
    pub fn advance(&mut self, days: u32) -> Option<GameDate> {
        if !self.running {
            return None;
        }
        self.date = self.date.add_days(days);
        self.tick_count += 1;
        Some(self.date)
    }
}

impl TickDriver for SimClock {
    fn is_running(&self) -> bool {
        self.running
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn resume(&mut self) {
        self.running = true;
    }

    fn current_date(&self) -> GameDate {
        self.date
    }

    fn reset_calendar(&mut self) {
        self.date = GameDate::EPOCH;
        self.tick_count = 0;
    }
}
