#![allow(dead_code)]

use chrono::NaiveDate;
use valet_estimator::{Day, InMemoryLedger, TimeOfDay, Visit};

pub fn t(text: &str) -> TimeOfDay {
    TimeOfDay::parse(text)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(id: i64, on: NaiveDate, open: &str, close: &str) -> Day {
    Day::new(id, on, t(open), t(close)).unwrap()
}

pub fn visit(arrival: &str, departure: Option<&str>) -> Visit {
    Visit::new(t(arrival), departure.map(t))
}

/// A day shaped like a typical shift: `n` arrivals spaced `gap` minutes
/// apart from `first`, each staying `stay` minutes
pub fn steady_visits(first: &str, n: usize, gap: i64, stay: i64) -> Vec<Visit> {
    let start = t(first);
    (0..n as i64)
        .map(|i| {
            let arrival = start.plus_minutes(i * gap);
            Visit::new(arrival, Some(arrival.plus_minutes(stay)))
        })
        .collect()
}

/// Ledger of consecutive days from `first`, all 08:00 to 18:00, one visit
/// list per day
pub fn ledger_of(first: NaiveDate, days: Vec<Vec<Visit>>) -> InMemoryLedger {
    let mut ledger = InMemoryLedger::new();
    for (i, visits) in days.into_iter().enumerate() {
        let on = first + chrono::Duration::days(i as i64);
        ledger.insert_day(day(i as i64 + 1, on, "08:00", "18:00"), visits);
    }
    ledger
}
