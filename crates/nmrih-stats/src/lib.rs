//! Session reconstruction and player statistics.
//!
//! Everything here is pure and synchronous: the engine reads a slice of
//! [`EventRecord`]s and returns freshly built result values. No state is
//! kept between calls, so one engine can serve concurrent requests.
//!
//! # Modules
//!
//! - [`session`] -- [`SessionReconstructor`], events to `[start, end)` sessions
//! - [`time_spent`] -- Total time per player ranking
//! - [`countries`] -- Connection share per country
//! - [`online`] -- Average concurrent players per hour of day
//! - [`config`] -- [`StatsConfig`] limits and thresholds

pub mod config;
pub mod countries;
pub mod online;
pub mod session;
pub mod time_spent;

use chrono::{DateTime, Utc};
use nmrih_types::{CountryShare, EventRecord, HourlyOnline, TimeSpent};
use tracing::debug;

pub use config::StatsConfig;
pub use session::SessionReconstructor;

/// Computes the derived statistics over a full record set.
#[derive(Debug, Clone, Default)]
pub struct StatsEngine {
    config: StatsConfig,
}

impl StatsEngine {
    /// Create an engine with the given limits.
    pub const fn new(config: StatsConfig) -> Self {
        Self { config }
    }

    /// Players ranked by total session time, longest first.
    pub fn top_time_spent(&self, records: &[EventRecord]) -> Vec<TimeSpent> {
        let ranked = time_spent::top_time_spent(records, self.config.top_players);
        debug!(records = records.len(), players = ranked.len(), "time spent ranked");
        ranked
    }

    /// Connection share of the most common countries plus `Other`.
    pub fn top_countries(&self, records: &[EventRecord]) -> Vec<CountryShare> {
        countries::top_countries(records, self.config.top_countries)
    }

    /// Hourly concurrent-player averages up to the current day.
    pub fn online_statistics(&self, records: &[EventRecord]) -> Vec<HourlyOnline> {
        self.online_statistics_at(records, Utc::now())
    }

    /// Hourly concurrent-player averages up to the day of `now`.
    pub fn online_statistics_at(
        &self,
        records: &[EventRecord],
        now: DateTime<Utc>,
    ) -> Vec<HourlyOnline> {
        online::online_statistics_at(records, now, self.config.min_session)
    }
}
