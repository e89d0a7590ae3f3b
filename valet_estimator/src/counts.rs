//! Per-day counts derived from visits
//!
//! Every model works from the same few numbers about a day as seen at a
//! cutoff time: how many bikes had arrived, how many were still to come, how
//! busy the following hour was, and when the day peaked.

use crate::ledger::Visit;
use crate::time::{TimeOfDay, MINUTES_PER_DAY};

/// Length of the lookahead window for next-hour activity, in minutes
pub const LOOKAHEAD_MINUTES: i64 = 60;

/// Counts for one day at one cutoff time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CutoffCounts {
    /// Arrivals at or before the cutoff
    pub before: i64,
    /// Arrivals strictly after the cutoff (the rest of today's arrivals)
    pub after: i64,
    /// Departures at or before the cutoff
    pub departed: i64,
    /// Arrivals in `(t, t + 60]`
    pub ins_next: i64,
    /// Departures in `(t, t + 60]`
    pub outs_next: i64,
}

impl CutoffCounts {
    /// Check-ins plus check-outs in the next hour
    pub fn next_hour_activity(&self) -> i64 {
        self.ins_next + self.outs_next
    }

    /// Bikes on site at the cutoff
    pub fn on_site(&self) -> i64 {
        self.before - self.departed
    }
}

/// Peak occupancy of a day and the first time it was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    /// Most bikes on site at once
    pub occupancy: i64,
    /// When that maximum was first reached
    pub at: TimeOfDay,
}

/// Counts for cutoff `t` with a one-hour lookahead clamped to the end of day
pub fn counts_for_time(visits: &[Visit], t: TimeOfDay) -> CutoffCounts {
    let Some(t_m) = t.minutes() else {
        return CutoffCounts::default();
    };
    let end_m = (t_m + LOOKAHEAD_MINUTES).min(MINUTES_PER_DAY);
    let in_window = |m: i64| t_m < m && m <= end_m;

    let mut counts = CutoffCounts::default();
    for visit in visits {
        if let Some(a) = visit.arrival.minutes() {
            if a <= t_m {
                counts.before += 1;
            } else {
                counts.after += 1;
            }
            if in_window(a) {
                counts.ins_next += 1;
            }
        }
        if let Some(d) = visit.departure.and_then(|d| d.minutes()) {
            if d <= t_m {
                counts.departed += 1;
            }
            if in_window(d) {
                counts.outs_next += 1;
            }
        }
    }
    counts
}

/// Peak occupancy over the whole day.
///
/// Arrivals count +1 and departures -1. Events are swept in time order with
/// arrivals ahead of departures at the same minute, so a bike arriving as
/// another leaves is briefly counted alongside it. With no events the peak is
/// zero at midnight.
pub fn peak_all_day(visits: &[Visit]) -> Peak {
    let mut events: Vec<(i64, i64)> = Vec::with_capacity(visits.len() * 2);
    for visit in visits {
        if let Some(a) = visit.arrival.minutes() {
            events.push((a, 1));
        }
        if let Some(d) = visit.departure.and_then(|d| d.minutes()) {
            events.push((d, -1));
        }
    }
    if events.is_empty() {
        return Peak {
            occupancy: 0,
            at: TimeOfDay::MIDNIGHT,
        };
    }

    // (time ascending, +1 before -1)
    events.sort_by_key(|&(minute, delta)| (minute, -delta));

    let mut occupancy = 0;
    let mut peak = Peak {
        occupancy: 0,
        at: TimeOfDay::from_minutes(events[0].0),
    };
    for (minute, delta) in events {
        occupancy += delta;
        if occupancy > peak.occupancy {
            peak = Peak {
                occupancy,
                at: TimeOfDay::from_minutes(minute),
            };
        }
    }
    peak
}
