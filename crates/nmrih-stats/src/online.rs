//! Average concurrent players per hour of day.
//!
//! Sessions are clipped to the observed timeline, which runs from midnight
//! of the earliest event to the end of the current day. Each session adds
//! its overlap, in seconds, with every hour block it touches to that block's
//! hour-of-day bucket. A bucket's total divided by `days * 3600` is the
//! average number of players online during that hour.
//!
//! The result starts at 03:00 and wraps around, which is how the dashboard
//! lays out its day.

use chrono::{DateTime, DurationRound, NaiveTime, TimeDelta, Timelike, Utc};
use nmrih_types::{EventRecord, HourlyOnline};

use crate::session::SessionReconstructor;

/// Number of hour-of-day buckets.
pub const HOURS_PER_DAY: usize = 24;

/// Hour of day the output starts at.
pub const FIRST_DISPLAY_HOUR: usize = 3;

const SECONDS_PER_HOUR: i64 = 3600;

/// Hourly averages over the timeline ending with the day of `now`.
///
/// Only `connected` and `disconnected` events are considered, and sessions
/// shorter than `min_session` are ignored. Always returns 24 entries, in the
/// order `3, 4, ..., 23, 0, 1, 2`.
pub fn online_statistics_at(
    records: &[EventRecord],
    now: DateTime<Utc>,
    min_session: TimeDelta,
) -> Vec<HourlyOnline> {
    let boundaries: Vec<&EventRecord> = records
        .iter()
        .filter(|record| record.action().is_session_boundary())
        .collect();

    let earliest = boundaries
        .iter()
        .map(|record| record.timestamp())
        .min()
        .unwrap_or(now);
    let timeline_start = midnight(earliest);
    let timeline_end = midnight(now);
    let days = timeline_end
        .signed_duration_since(timeline_start)
        .num_days()
        .max(1);
    let window_end = timeline_end
        .checked_add_signed(TimeDelta::days(1))
        .unwrap_or(timeline_end);

    let sessions = SessionReconstructor::with_min_duration(min_session).reconstruct(boundaries);

    let mut overlap = [0_i64; HOURS_PER_DAY];
    for session in &sessions {
        let start = session.start.max(timeline_start);
        let end = session.end.min(window_end);
        if end > start {
            accumulate(&mut overlap, start, end);
        }
    }

    let observed_seconds = days.saturating_mul(SECONDS_PER_HOUR);
    (FIRST_DISPLAY_HOUR..HOURS_PER_DAY)
        .chain(0..FIRST_DISPLAY_HOUR)
        .map(|hour| HourlyOnline {
            hour: u8::try_from(hour).unwrap_or_default(),
            concurrent_players_count: average(
                overlap.get(hour).copied().unwrap_or_default(),
                observed_seconds,
            ),
        })
        .collect()
}

/// Add the overlap of `[start, end)` with each hour block to its bucket.
fn accumulate(overlap: &mut [i64; HOURS_PER_DAY], start: DateTime<Utc>, end: DateTime<Utc>) {
    let mut block = start.duration_trunc(TimeDelta::hours(1)).unwrap_or(start);
    while block < end {
        let Some(next) = block.checked_add_signed(TimeDelta::hours(1)) else {
            break;
        };
        let seconds = end
            .min(next)
            .signed_duration_since(start.max(block))
            .num_seconds();
        if let Some(bucket) = usize::try_from(block.hour())
            .ok()
            .and_then(|hour| overlap.get_mut(hour))
        {
            *bucket = bucket.saturating_add(seconds);
        }
        block = next;
    }
}

fn midnight(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn average(seconds: i64, observed_seconds: i64) -> f64 {
    if observed_seconds <= 0 {
        return 0.0;
    }
    // Both values are bounded by the timeline length in seconds.
    #[allow(clippy::cast_precision_loss)]
    let value = seconds as f64 / observed_seconds as f64;
    value
}
