//! Elapsed hours between two time-of-day strings.
//!
//! Both times sit on a common reference day. An end at or before the start
//! is taken to fall on the next day, so `23:00 → 07:00` is eight hours and
//! `08:00 → 08:00` is a full 24.

use chrono::{Duration, NaiveTime};

const SECS_PER_HOUR: f64 = 3600.0;

/// `HH:MM` or `HH:MM:SS`, surrounding whitespace ignored.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Hours from `start` to `end`. A missing or blank endpoint yields 0, as
/// does anything that is not `HH:MM` / `HH:MM:SS` (logged, never an error).
pub fn duration_hours(start: Option<&str>, end: Option<&str>) -> f64 {
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if !s.trim().is_empty() && !e.trim().is_empty() => (s, e),
        _ => return 0.0,
    };

    let (Some(from), Some(to)) = (parse_time_of_day(start), parse_time_of_day(end)) else {
        tracing::warn!(start, end, "Unparseable time of day, duration treated as 0");
        return 0.0;
    };

    let mut elapsed = to - from;
    if elapsed <= Duration::zero() {
        elapsed = elapsed + Duration::hours(24);
    }
    elapsed.num_seconds() as f64 / SECS_PER_HOUR
}
