use rstest::rstest;
use valet_estimator::time::{fraction_elapsed, MINUTES_PER_DAY};
use valet_estimator::TimeOfDay;

#[rstest]
#[case("09:05", 545)]
#[case("9:05", 545)]
#[case("0905", 545)]
#[case("905", 545)]
#[case("12:30:45", 750)]
#[case(" 17:00 ", 1020)]
#[case("00:00", 0)]
#[case("24:00", 1440)]
fn test_parse_valid(#[case] text: &str, #[case] minutes: i64) {
    assert_eq!(TimeOfDay::parse(text).minutes(), Some(minutes));
}

#[rstest]
#[case("")]
#[case("noon")]
#[case("25:00")]
#[case("12:60")]
#[case("9:5")]
#[case("12")]
#[case("12345")]
#[case("1:2:3:4")]
fn test_parse_invalid_is_unset(#[case] text: &str) {
    let time = TimeOfDay::parse(text);
    assert!(!time.is_set());
    assert_eq!(time, TimeOfDay::UNSET);
    assert_eq!(time.to_string(), "");
}

#[test]
fn test_ordering_and_equality() {
    assert!(TimeOfDay::parse("08:00") < TimeOfDay::parse("8:01"));
    assert_eq!(TimeOfDay::parse("0800"), TimeOfDay::parse("08:00"));
    assert!(TimeOfDay::UNSET < TimeOfDay::MIDNIGHT);
}

#[test]
fn test_arithmetic_clamps() {
    let late = TimeOfDay::parse("23:30");
    assert_eq!(late.plus_minutes(60).minutes(), Some(MINUTES_PER_DAY));
    assert_eq!(TimeOfDay::parse("00:10").plus_minutes(-30), TimeOfDay::MIDNIGHT);
    assert_eq!(TimeOfDay::UNSET.plus_minutes(5), TimeOfDay::UNSET);
    assert_eq!(TimeOfDay::from_minutes(5000).minutes(), Some(MINUTES_PER_DAY));
}

#[test]
fn test_display_forms() {
    let t = TimeOfDay::parse("9:05");
    assert_eq!(t.to_string(), "09:05");
    assert_eq!(t.short(), "9:05");
    assert_eq!(TimeOfDay::parse("17:45").short(), "17:45");
}

#[test]
fn test_serde_as_string() {
    let json = serde_json::to_string(&TimeOfDay::parse("07:15")).unwrap();
    assert_eq!(json, "\"07:15\"");
    let back: TimeOfDay = serde_json::from_str(&json).unwrap();
    assert_eq!(back.minutes(), Some(435));
}

#[test]
fn test_fraction_elapsed() {
    let open = TimeOfDay::parse("08:00");
    let close = TimeOfDay::parse("18:00");
    assert_eq!(fraction_elapsed(open, close, TimeOfDay::parse("13:00")), 0.5);
    assert_eq!(fraction_elapsed(open, close, TimeOfDay::parse("07:00")), 0.0);
    assert_eq!(fraction_elapsed(open, close, TimeOfDay::parse("19:00")), 1.0);
    // zero-length day does not divide by zero
    assert_eq!(fraction_elapsed(open, open, TimeOfDay::parse("08:30")), 1.0);
}
