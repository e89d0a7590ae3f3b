//! Minute-resolution clock values
//!
//! A [`TimeOfDay`] is minutes since midnight in `[0, 1440]`, or the unset
//! sentinel when the source text could not be understood. Unset sorts before
//! every set value and is falsy via [`TimeOfDay::is_set`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes in a day; also the latest representable time (24:00)
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// A clock time of day with minute resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TimeOfDay {
    minutes: Option<u16>,
}

impl TimeOfDay {
    /// The unset sentinel
    pub const UNSET: TimeOfDay = TimeOfDay { minutes: None };

    /// Midnight at the start of the day
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { minutes: Some(0) };

    /// Build from minutes since midnight, clamped to `[0, 1440]`
    pub fn from_minutes(minutes: i64) -> Self {
        Self {
            minutes: Some(minutes.clamp(0, MINUTES_PER_DAY) as u16),
        }
    }

    /// Build from hours and minutes; out-of-range parts give the unset sentinel
    pub fn from_hm(hours: u32, minutes: u32) -> Self {
        if hours > 24 || minutes > 59 {
            return Self::UNSET;
        }
        Self::from_minutes(i64::from(hours * 60 + minutes))
    }

    /// Parse `HH:MM`, `H:MM`, `HH:MM:SS` or compact `HMM` / `HHMM`.
    ///
    /// Seconds are accepted and ignored. Anything else, including hours above
    /// 24 or minutes above 59, yields the unset sentinel.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

        let (hours, minutes) = if text.contains(':') {
            let parts: Vec<&str> = text.split(':').collect();
            if parts.len() > 3 || !parts.iter().all(|p| all_digits(p)) {
                return Self::UNSET;
            }
            if parts[1].len() != 2 || parts.get(2).is_some_and(|s| s.len() != 2) {
                return Self::UNSET;
            }
            (parts[0], parts[1])
        } else if all_digits(text) && (3..=4).contains(&text.len()) {
            text.split_at(text.len() - 2)
        } else {
            return Self::UNSET;
        };

        match (hours.parse::<u32>(), minutes.parse::<u32>()) {
            (Ok(h), Ok(m)) => Self::from_hm(h, m),
            _ => Self::UNSET,
        }
    }

    /// Whether this holds a real time
    pub fn is_set(&self) -> bool {
        self.minutes.is_some()
    }

    /// Minutes since midnight, if set
    pub fn minutes(&self) -> Option<i64> {
        self.minutes.map(i64::from)
    }

    /// This time moved by `delta` minutes, clamped to the day.
    /// Unset stays unset.
    pub fn plus_minutes(&self, delta: i64) -> Self {
        match self.minutes() {
            Some(m) => Self::from_minutes(m + delta),
            None => Self::UNSET,
        }
    }

    /// `H:MM` without the leading zero, for display
    pub fn short(&self) -> String {
        let full = self.to_string();
        match full.strip_prefix('0') {
            Some(rest) if rest.len() == 4 => rest.to_string(),
            _ => full,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minutes {
            Some(m) => write!(f, "{:02}:{:02}", m / 60, m % 60),
            None => Ok(()),
        }
    }
}

impl From<&str> for TimeOfDay {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for TimeOfDay {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

/// Fraction of the operating day elapsed at `at`, clamped to `[0, 1]`.
///
/// A zero-length (or inverted) day is treated as one minute long so the
/// division is always defined. Unset inputs count as the opening time.
pub fn fraction_elapsed(open: TimeOfDay, close: TimeOfDay, at: TimeOfDay) -> f64 {
    let open_m = open.minutes().unwrap_or(0);
    let close_m = close.minutes().unwrap_or(open_m);
    let at_m = at.minutes().unwrap_or(open_m);
    let span = (close_m - open_m).max(1) as f64;
    ((at_m - open_m) as f64 / span).clamp(0.0, 1.0)
}
