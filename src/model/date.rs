use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DAYS_PER_MONTH: u32 = 8;
pub const MONTHS_PER_YEAR: u32 = 12;
pub const DAYS_PER_YEAR: u32 = DAYS_PER_MONTH * MONTHS_PER_YEAR;

/// First year of a freshly restarted world.
pub const EPOCH_YEAR: i32 = 4000;

/// Calendar date in the simulation's 12 × 8-day year.
///
/// Field order gives chronological ordering for the derived `Ord`.
/// Serialized as an ISO-like `"YYYY-MM-DD"` string.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct GameDate {
    year: i32,
    month: u8,
    day: u8,
}

impl GameDate {
    /// The calendar epoch, `4000-01-01`.
    pub const EPOCH: GameDate = GameDate {
        year: EPOCH_YEAR,
        month: 1,
        day: 1,
    };

    /// Create a date from year, month (1–12) and day of month (1–8).
    pub fn new(year: i32, month: u8, day: u8) -> Self {
        assert!(
            (1..=MONTHS_PER_YEAR as u8).contains(&month),
            "month out of range: {month}"
        );
        assert!(
            (1..=DAYS_PER_MONTH as u8).contains(&day),
            "day out of range: {day}"
        );
        Self { year, month, day }
    }

    pub fn checked(year: i32, month: u8, day: u8) -> Option<Self> {
        let month_ok = (1..=MONTHS_PER_YEAR as u8).contains(&month);
        let day_ok = (1..=DAYS_PER_MONTH as u8).contains(&day);
        (month_ok && day_ok).then_some(Self { year, month, day })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u8 {
        self.month
    }

    pub fn day(self) -> u8 {
        self.day
    }

    /// Days elapsed since year 0, month 1, day 1.
    pub fn day_number(self) -> i64 {
        self.year as i64 * DAYS_PER_YEAR as i64
            + (self.month as i64 - 1) * DAYS_PER_MONTH as i64
            + (self.day as i64 - 1)
    }

    pub fn from_day_number(n: i64) -> Self {
        let year = n.div_euclid(DAYS_PER_YEAR as i64);
        let within = n.rem_euclid(DAYS_PER_YEAR as i64) as u32;
        Self {
            year: year as i32,
            month: (within / DAYS_PER_MONTH + 1) as u8,
            day: (within % DAYS_PER_MONTH + 1) as u8,
        }
    }

    pub fn add_days(self, days: u32) -> Self {
        Self::from_day_number(self.day_number() + days as i64)
    }

    /// Whole years between `self` (a birth date) and `current`.
    /// Negative when `current` precedes the birth date.
    pub fn age_on(self, current: GameDate) -> i32 {
        let mut years = current.year - self.year;
        if (current.month, current.day) < (self.month, self.day) {
            years -= 1;
        }
        years
    }
}

impl Default for GameDate {
    fn default() -> Self {
        Self::EPOCH
    }
}

impl fmt::Display for GameDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for GameDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split from the right so negative years survive.
        let mut parts = s.rsplitn(3, '-');
        let day = parts.next();
        let month = parts.next();
        let year = parts.next();
        let (Some(year), Some(month), Some(day)) = (year, month, day) else {
            return Err(format!("malformed date: {s}"));
        };
        let year: i32 = year.parse().map_err(|_| format!("bad year in {s}"))?;
        let month: u8 = month.parse().map_err(|_| format!("bad month in {s}"))?;
        let day: u8 = day.parse().map_err(|_| format!("bad day in {s}"))?;
        GameDate::checked(year, month, day).ok_or_else(|| format!("date out of range: {s}"))
    }
}

impl From<GameDate> for String {
    fn from(date: GameDate) -> Self {
        date.to_string()
    }
}

impl TryFrom<String> for GameDate {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
