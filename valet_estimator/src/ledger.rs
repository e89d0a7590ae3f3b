//! Read-only view of the historical record store
//!
//! The record store itself lives outside this crate. The estimator only ever
//! reads days by date range or date, and visits by day identity, through the
//! [`VisitLedger`] trait. [`InMemoryLedger`] is the stock implementation,
//! filled from CSV files (see [`crate::data`]) or built directly in tests.

use crate::error::{EstimatorError, Result};
use crate::time::TimeOfDay;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity of a recorded day in the store
pub type DayId = i64;

/// One operating day of the valet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    /// Store identity
    pub id: DayId,
    /// Calendar date
    pub date: NaiveDate,
    /// Opening time
    pub open: TimeOfDay,
    /// Closing time
    pub close: TimeOfDay,
}

impl Day {
    /// Create a day, rejecting a closing time before the opening time
    pub fn new(id: DayId, date: NaiveDate, open: TimeOfDay, close: TimeOfDay) -> Result<Self> {
        if !open.is_set() || !close.is_set() {
            return Err(EstimatorError::DataError(format!(
                "day {date} has an unreadable opening or closing time"
            )));
        }
        if open > close {
            return Err(EstimatorError::DataError(format!(
                "day {date} closes ({close}) before it opens ({open})"
            )));
        }
        Ok(Self {
            id,
            date,
            open,
            close,
        })
    }

    /// Operating span in minutes
    pub fn span_minutes(&self) -> i64 {
        match (self.open.minutes(), self.close.minutes()) {
            (Some(o), Some(c)) => c - o,
            _ => 0,
        }
    }
}

/// One bike's stay on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    /// Check-in time
    pub arrival: TimeOfDay,
    /// Check-out time; `None` while on site or if never recorded
    pub departure: Option<TimeOfDay>,
}

impl Visit {
    /// A visit with a recorded departure. A departure earlier than the
    /// arrival is treated as not recorded.
    pub fn new(arrival: TimeOfDay, departure: Option<TimeOfDay>) -> Self {
        let departure = departure.filter(|d| d.is_set() && *d >= arrival);
        Self { arrival, departure }
    }

    /// A bike that is still on site
    pub fn open_ended(arrival: TimeOfDay) -> Self {
        Self {
            arrival,
            departure: None,
        }
    }
}

/// Read access to historical days and their visits
pub trait VisitLedger {
    /// Days with `start <= date <= end`, sorted by date. Open bounds are unbounded.
    fn days_between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Vec<Day>>;

    /// The day recorded for `date`, if any
    fn day_on(&self, date: NaiveDate) -> Result<Option<Day>>;

    /// All visits recorded for a day, ordered by arrival
    fn visits_for_day(&self, day: DayId) -> Result<Vec<Visit>>;

    /// Days strictly before `date`, sorted by date
    fn days_before(&self, date: NaiveDate) -> Result<Vec<Day>> {
        Ok(self
            .days_between(None, date.pred_opt())?
            .into_iter()
            .filter(|d| d.date < date)
            .collect())
    }
}

/// A ledger held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    days: Vec<Day>,
    visits: HashMap<DayId, Vec<Visit>>,
}

impl InMemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a day together with its visits, replacing any day with the same id
    pub fn insert_day(&mut self, day: Day, mut visits: Vec<Visit>) {
        visits.sort_by_key(|v| v.arrival);
        // every held day has a visits entry, so a hit here means a replacement
        if self.visits.insert(day.id, visits).is_some() {
            self.days.retain(|d| d.id != day.id);
        }
        let key = (day.date, day.id);
        let at = self.days.partition_point(|d| (d.date, d.id) <= key);
        self.days.insert(at, day);
    }

    /// Add one visit to an existing day, after any visits with the same arrival
    pub fn push_visit(&mut self, day: DayId, visit: Visit) -> Result<()> {
        let Some(visits) = self.visits.get_mut(&day) else {
            return Err(EstimatorError::DataError(format!(
                "visit refers to unknown day id {day}"
            )));
        };
        let at = visits.partition_point(|v| v.arrival <= visit.arrival);
        visits.insert(at, visit);
        Ok(())
    }

    /// Number of days held
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Whether the ledger holds no days
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl VisitLedger for InMemoryLedger {
    fn days_between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Vec<Day>> {
        Ok(self
            .days
            .iter()
            .filter(|d| start.map_or(true, |s| d.date >= s))
            .filter(|d| end.map_or(true, |e| d.date <= e))
            .cloned()
            .collect())
    }

    fn day_on(&self, date: NaiveDate) -> Result<Option<Day>> {
        Ok(self.days.iter().find(|d| d.date == date).cloned())
    }

    fn visits_for_day(&self, day: DayId) -> Result<Vec<Visit>> {
        Ok(self.visits.get(&day).cloned().unwrap_or_default())
    }
}

/// An immutable, fully loaded copy of a date range of history.
///
/// The backtest reads only from this snapshot, so per-day work can run on
/// several threads without locking.
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    days: Vec<Day>,
    visits: HashMap<DayId, Vec<Visit>>,
}

impl HistorySnapshot {
    /// Load every day in the range and all of their visits
    pub fn load<L: VisitLedger + ?Sized>(
        ledger: &L,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self> {
        let mut days = ledger.days_between(start, end)?;
        days.sort_by_key(|d| (d.date, d.id));
        let mut visits = HashMap::with_capacity(days.len());
        for day in &days {
            visits.insert(day.id, ledger.visits_for_day(day.id)?);
        }
        log::info!(
            "loaded history snapshot: {} days, {} visits",
            days.len(),
            visits.values().map(Vec::len).sum::<usize>()
        );
        Ok(Self { days, visits })
    }

    /// Days in date order
    pub fn days(&self) -> &[Day] {
        &self.days
    }

    /// Visits of one day (empty if the day recorded none)
    pub fn visits(&self, day: DayId) -> &[Visit] {
        self.visits.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }
}
