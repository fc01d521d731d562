use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CareError, CareResult};

/// Interval in whole days between two occurrences of a care action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Cadence(u32);

impl Cadence {
    pub fn new(days: i64) -> CareResult<Self> {
        if days < 1 || days > i64::from(u32::MAX) {
            return Err(CareError::InvalidCadence { days });
        }
        Ok(Self(days as u32))
    }

    pub fn days(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Cadence {
    type Error = CareError;

    fn try_from(days: i64) -> Result<Self, Self::Error> {
        Cadence::new(days)
    }
}

impl From<Cadence> for u32 {
    fn from(cadence: Cadence) -> Self {
        cadence.0
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 == 1 {
            f.write_str("every day")
        } else {
            write!(f, "every {} days", self.0)
        }
    }
}

/// Date an action is next due. Never performed means due today.
pub fn next_due_date(
    last_performed: Option<NaiveDate>,
    frequency_days: i64,
    today: NaiveDate,
) -> CareResult<NaiveDate> {
    let cadence = Cadence::new(frequency_days)?;
    next_due(last_performed, cadence, today).ok_or_else(|| CareError::DueDateOutOfRange {
        last_performed: last_performed.unwrap_or(today),
        days: cadence.days(),
    })
}

/// `None` when the due date falls past the last representable calendar day.
pub(crate) fn next_due(
    last_performed: Option<NaiveDate>,
    cadence: Cadence,
    today: NaiveDate,
) -> Option<NaiveDate> {
    match last_performed {
        Some(date) => date.checked_add_days(Days::new(u64::from(cadence.days()))),
        None => Some(today),
    }
}

/// Signed day count from `today` to `due`; zero or negative means due now.
pub fn days_until_due(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}

/// How a due date reads relative to today. Overdue collapses into `Today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", content = "days", rename_all = "snake_case")]
pub enum DueIn {
    Today,
    Tomorrow,
    InDays(u32),
}

impl DueIn {
    pub fn from_dates(due: NaiveDate, today: NaiveDate) -> Self {
        match days_until_due(due, today) {
            n if n <= 0 => DueIn::Today,
            1 => DueIn::Tomorrow,
            n => DueIn::InDays(u32::try_from(n).unwrap_or(u32::MAX)),
        }
    }
}

impl std::fmt::Display for DueIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DueIn::Today => f.write_str("Today"),
            DueIn::Tomorrow => f.write_str("Tomorrow"),
            DueIn::InDays(days) => write!(f, "In {days} days"),
        }
    }
}

/// How long ago an action was last performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", content = "days", rename_all = "snake_case")]
pub enum SinceLast {
    Never,
    Today,
    Yesterday,
    DaysAgo(u32),
}

impl SinceLast {
    pub fn from_dates(last_performed: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(last) = last_performed else {
            return SinceLast::Never;
        };
        match (today - last).num_days() {
            n if n <= 0 => SinceLast::Today,
            1 => SinceLast::Yesterday,
            n => SinceLast::DaysAgo(u32::try_from(n).unwrap_or(u32::MAX)),
        }
    }
}

impl std::fmt::Display for SinceLast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinceLast::Never => f.write_str("Never"),
            SinceLast::Today => f.write_str("Today"),
            SinceLast::Yesterday => f.write_str("Yesterday"),
            SinceLast::DaysAgo(days) => write!(f, "{days} days ago"),
        }
    }
}
