use std::fs;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use valet_estimator::{
    DataLoader, Day, EstimatorError, HistorySnapshot, InMemoryLedger, TimeOfDay, Visit,
    VisitLedger,
};

const DAYS: &str = "\
id,date,time_open,time_closed
1,2024-06-03,08:00,18:00
2,2024-06-04,8:15,17:45
";

const VISITS: &str = "\
day_id,time_in,time_out
1,09:10,10:00
1,08:05,
2,08:20,08:50
2,,09:00
2,10:00,09:30
";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_load_from_readers() {
    let ledger = DataLoader::ledger_from_readers(DAYS.as_bytes(), VISITS.as_bytes()).unwrap();
    assert_eq!(ledger.len(), 2);

    let second = ledger.day_on(date(2024, 6, 4)).unwrap().unwrap();
    assert_eq!(second.id, 2);
    assert_eq!(second.open, TimeOfDay::parse("08:15"));

    // sorted by arrival; the empty check-out stays open
    let first = ledger.visits_for_day(1).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].arrival.to_string(), "08:05");
    assert_eq!(first[0].departure, None);
    assert_eq!(first[1].departure, Some(TimeOfDay::parse("10:00")));

    // unreadable check-in skipped, check-out before check-in dropped
    let second = ledger.visits_for_day(2).unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[1].arrival.to_string(), "10:00");
    assert_eq!(second[1].departure, None);
}

#[test]
fn test_load_from_files() {
    let dir = TempDir::new().unwrap();
    let days = dir.path().join("days.csv");
    let visits = dir.path().join("visits.csv");
    fs::write(&days, DAYS).unwrap();
    fs::write(&visits, VISITS).unwrap();

    let ledger = DataLoader::ledger_from_csv(&days, &visits).unwrap();
    let snapshot = HistorySnapshot::load(&ledger, None, Some(date(2024, 6, 3))).unwrap();
    assert_eq!(snapshot.days().len(), 1);
    assert_eq!(snapshot.visits(1).len(), 2);
    assert!(snapshot.visits(2).is_empty());
}

#[test]
fn test_missing_file_is_store_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = DataLoader::ledger_from_csv(dir.path().join("days.csv"), dir.path().join("v.csv"))
        .unwrap_err();
    assert!(matches!(err, EstimatorError::StoreUnavailable(_)));
}

#[test]
fn test_bad_rows_are_data_errors() {
    let bad_date = "id,date,time_open,time_closed\n1,03/06/2024,08:00,18:00\n";
    let err = DataLoader::ledger_from_readers(bad_date.as_bytes(), VISITS.as_bytes()).unwrap_err();
    assert!(matches!(err, EstimatorError::DataError(_)));

    let backwards = "id,date,time_open,time_closed\n1,2024-06-03,18:00,08:00\n";
    let no_visits = "day_id,time_in,time_out\n";
    let err = DataLoader::ledger_from_readers(backwards.as_bytes(), no_visits.as_bytes())
        .unwrap_err();
    assert!(matches!(err, EstimatorError::DataError(_)));

    let orphan = "day_id,time_in,time_out\n9,08:00,09:00\n";
    let err = DataLoader::ledger_from_readers(DAYS.as_bytes(), orphan.as_bytes()).unwrap_err();
    assert!(matches!(err, EstimatorError::DataError(_)));
}

#[test]
fn test_push_visit_keeps_arrival_order() {
    let mut ledger = InMemoryLedger::new();
    let (open, close) = (TimeOfDay::parse("08:00"), TimeOfDay::parse("18:00"));
    ledger.insert_day(Day::new(7, date(2024, 6, 3), open, close).unwrap(), Vec::new());

    for (arrival, departure) in [
        ("11:00", "12:00"),
        ("09:00", "10:00"),
        ("11:00", "11:30"),
        ("08:30", "09:00"),
    ] {
        let visit = Visit::new(TimeOfDay::parse(arrival), Some(TimeOfDay::parse(departure)));
        ledger.push_visit(7, visit).unwrap();
    }

    let visits = ledger.visits_for_day(7).unwrap();
    let order: Vec<String> = visits
        .iter()
        .map(|v| format!("{}-{}", v.arrival, v.departure.unwrap()))
        .collect();
    // equal arrivals stay in the order they were pushed
    assert_eq!(
        order,
        vec!["08:30-09:00", "09:00-10:00", "11:00-12:00", "11:00-11:30"]
    );

    let err = ledger.push_visit(8, visits[0]).unwrap_err();
    assert!(matches!(err, EstimatorError::DataError(_)));
}

#[test]
fn test_insert_day_keeps_date_order_and_replaces() {
    let mut ledger = InMemoryLedger::new();
    let open = TimeOfDay::parse("08:00");
    let close = TimeOfDay::parse("18:00");
    for (id, d) in [(3, 5), (1, 3), (2, 4)] {
        ledger.insert_day(Day::new(id, date(2024, 6, d), open, close).unwrap(), Vec::new());
    }
    let ids: Vec<i64> = ledger
        .days_between(None, None)
        .unwrap()
        .iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);

    // same id again: moved to its new date, not duplicated
    ledger.insert_day(
        Day::new(1, date(2024, 6, 9), open, close).unwrap(),
        vec![Visit::open_ended(TimeOfDay::parse("09:00"))],
    );
    assert_eq!(ledger.len(), 3);
    let ids: Vec<i64> = ledger
        .days_between(None, None)
        .unwrap()
        .iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec![2, 3, 1]);
    assert_eq!(ledger.visits_for_day(1).unwrap().len(), 1);
}

#[test]
fn test_large_unsorted_visit_table_loads_in_order() {
    let mut visits = String::from("day_id,time_in,time_out\n");
    for i in (0..3000).rev() {
        let minute = 480 + i % 600;
        visits.push_str(&format!("1,{:02}:{:02},\n", minute / 60, minute % 60));
    }
    let ledger = DataLoader::ledger_from_readers(DAYS.as_bytes(), visits.as_bytes()).unwrap();
    let loaded = ledger.visits_for_day(1).unwrap();
    assert_eq!(loaded.len(), 3000);
    assert!(loaded.windows(2).all(|w| w[0].arrival <= w[1].arrival));
}

#[test]
fn test_days_before_excludes_the_date() {
    let ledger = DataLoader::ledger_from_readers(DAYS.as_bytes(), VISITS.as_bytes()).unwrap();
    let before = ledger.days_before(date(2024, 6, 4)).unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].date, date(2024, 6, 3));
    assert!(ledger.days_before(date(2024, 6, 3)).unwrap().is_empty());
}
