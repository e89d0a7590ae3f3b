//! Choosing the historical days a target day may learn from

use crate::ledger::Day;

/// Days strictly earlier than `target` whose opening and closing times are
/// each within the given tolerance (minutes) of the target's.
///
/// Never returns a day dated on or after the target, whatever the order of
/// `history`; the result keeps `history`'s order.
pub fn similar_days<'a>(
    history: &'a [Day],
    target: &Day,
    open_tolerance: i64,
    close_tolerance: i64,
) -> Vec<&'a Day> {
    let within = |a: Option<i64>, b: Option<i64>, tol: i64| match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() <= tol,
        _ => false,
    };

    history
        .iter()
        .filter(|d| d.date < target.date)
        .filter(|d| within(d.open.minutes(), target.open.minutes(), open_tolerance))
        .filter(|d| within(d.close.minutes(), target.close.minutes(), close_tolerance))
        .collect()
}
