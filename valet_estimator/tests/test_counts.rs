mod common;

use common::{t, visit};
use pretty_assertions::assert_eq;
use valet_estimator::{counts_for_time, peak_all_day, CutoffCounts, TimeOfDay};

#[test]
fn test_counts_for_time() {
    let visits = vec![
        visit("08:00", Some("09:00")),
        visit("08:30", Some("10:30")),
        visit("09:30", None),
        visit("10:15", Some("11:00")),
    ];

    let counts = counts_for_time(&visits, t("09:00"));
    assert_eq!(
        counts,
        CutoffCounts {
            before: 2,
            after: 2,
            departed: 1,
            ins_next: 1,
            outs_next: 0,
        }
    );
    assert_eq!(counts.next_hour_activity(), 1);
    assert_eq!(counts.on_site(), 1);

    let counts = counts_for_time(&visits, t("10:00"));
    assert_eq!(counts.before, 3);
    assert_eq!(counts.after, 1);
    // the 10:30 and 11:00 departures both fall in (10:00, 11:00]
    assert_eq!(counts.ins_next, 1);
    assert_eq!(counts.outs_next, 2);
}

#[test]
fn test_lookahead_is_clamped_to_day_end() {
    let visits = vec![visit("23:10", None), visit("23:59", None)];
    let counts = counts_for_time(&visits, t("23:30"));
    assert_eq!(counts.before, 1);
    assert_eq!(counts.ins_next, 1);
}

#[test]
fn test_unset_cutoff_counts_nothing() {
    let visits = vec![visit("08:00", None)];
    assert_eq!(
        counts_for_time(&visits, TimeOfDay::UNSET),
        CutoffCounts::default()
    );
}

#[test]
fn test_peak_all_day() {
    let visits = vec![
        visit("08:00", Some("09:00")),
        visit("08:30", Some("10:30")),
        visit("09:30", None),
        visit("10:15", Some("11:00")),
    ];
    let peak = peak_all_day(&visits);
    assert_eq!(peak.occupancy, 3);
    assert_eq!(peak.at, t("10:15"));
}

#[test]
fn test_peak_counts_arrival_before_departure_at_same_minute() {
    let visits = vec![visit("10:00", Some("10:05")), visit("10:05", Some("10:10"))];

    let peak = peak_all_day(&visits);
    assert_eq!(peak.occupancy, 2);
    assert_eq!(peak.at, t("10:05"));

    // at least one bike stays on site until the last departure
    for at in ["10:00", "10:05", "10:09"] {
        assert!(counts_for_time(&visits, t(at)).on_site() >= 1, "empty at {at}");
    }
    assert_eq!(counts_for_time(&visits, t("10:10")).on_site(), 0);
}

#[test]
fn test_peak_with_no_events() {
    let peak = peak_all_day(&[]);
    assert_eq!(peak.occupancy, 0);
    assert_eq!(peak.at, TimeOfDay::MIDNIGHT);
}

#[test]
fn test_departure_before_arrival_is_dropped() {
    let v = visit("12:00", Some("11:00"));
    assert_eq!(v.departure, None);
}
