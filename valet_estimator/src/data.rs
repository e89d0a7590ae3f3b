//! Loading day and visit history from CSV exports
//!
//! Two tables are expected, mirroring the record store's DAY and VISIT tables:
//!
//! ```text
//! days.csv:    id,date,time_open,time_closed
//! visits.csv:  day_id,time_in,time_out
//! ```
//!
//! `time_out` may be empty for bikes that never checked out.

use crate::error::{EstimatorError, Result};
use crate::ledger::{Day, DayId, InMemoryLedger, Visit};
use crate::time::TimeOfDay;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct DayRecord {
    id: DayId,
    date: String,
    time_open: String,
    time_closed: String,
}

#[derive(Debug, Deserialize)]
struct VisitRecord {
    day_id: DayId,
    time_in: String,
    time_out: Option<String>,
}

/// Data loader for valet history
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a ledger from a days CSV file and a visits CSV file
    pub fn ledger_from_csv<P: AsRef<Path>, Q: AsRef<Path>>(
        days_path: P,
        visits_path: Q,
    ) -> Result<InMemoryLedger> {
        let days = File::open(days_path.as_ref()).map_err(|e| {
            EstimatorError::StoreUnavailable(format!(
                "cannot open {}: {e}",
                days_path.as_ref().display()
            ))
        })?;
        let visits = File::open(visits_path.as_ref()).map_err(|e| {
            EstimatorError::StoreUnavailable(format!(
                "cannot open {}: {e}",
                visits_path.as_ref().display()
            ))
        })?;
        Self::ledger_from_readers(days, visits)
    }

    /// Load a ledger from any pair of CSV readers
    pub fn ledger_from_readers<R: Read, S: Read>(days: R, visits: S) -> Result<InMemoryLedger> {
        let mut ledger = InMemoryLedger::new();

        let mut reader = csv::Reader::from_reader(days);
        for (i, record) in reader.deserialize::<DayRecord>().enumerate() {
            let record = record?;
            let date = NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d").map_err(|e| {
                EstimatorError::DataError(format!("invalid date at days row {}: {e}", i + 2))
            })?;
            let day = Day::new(
                record.id,
                date,
                TimeOfDay::parse(&record.time_open),
                TimeOfDay::parse(&record.time_closed),
            )?;
            ledger.insert_day(day, Vec::new());
        }

        let mut reader = csv::Reader::from_reader(visits);
        let mut skipped = 0usize;
        for record in reader.deserialize::<VisitRecord>() {
            let record = record?;
            let arrival = TimeOfDay::parse(&record.time_in);
            if !arrival.is_set() {
                skipped += 1;
                continue;
            }
            let departure = record
                .time_out
                .as_deref()
                .map(TimeOfDay::parse)
                .filter(TimeOfDay::is_set);
            ledger.push_visit(record.day_id, Visit::new(arrival, departure))?;
        }
        if skipped > 0 {
            log::warn!("skipped {skipped} visits with an unreadable check-in time");
        }

        log::debug!("loaded {} days from CSV", ledger.len());
        Ok(ledger)
    }
}
