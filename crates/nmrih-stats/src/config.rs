//! Tunables of the statistics engine.

use chrono::TimeDelta;

/// Default minimum session length counted by the online statistics.
pub const DEFAULT_MIN_SESSION_MINUTES: i64 = 10;

/// Limits and thresholds applied by the [`StatsEngine`](crate::StatsEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    /// Sessions shorter than this are ignored by the online statistics
    /// (default: 10 minutes). Total time spent always counts every session.
    pub min_session: TimeDelta,

    /// Length of the time-spent ranking (default: 32).
    pub top_players: usize,

    /// Countries listed before the `Other` bucket (default: 9).
    pub top_countries: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            min_session: TimeDelta::minutes(DEFAULT_MIN_SESSION_MINUTES),
            top_players: 32,
            top_countries: 9,
        }
    }
}
