//! Output shapes returned by the statistics engine and the live roster.
//!
//! Field names on the wire match what the dashboard already consumes, which
//! is why some serialize under names that differ from the Rust field.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Total time one nickname spent on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimeSpent {
    /// The player's nickname.
    pub nick_name: String,
    /// Sum of all session durations, in nanoseconds.
    pub time_spent: i64,
}

impl TimeSpent {
    /// Build an entry from a nickname and a total duration.
    ///
    /// Durations beyond the nanosecond range saturate at `i64::MAX`.
    pub fn new(nick_name: impl Into<String>, total: TimeDelta) -> Self {
        Self {
            nick_name: nick_name.into(),
            time_spent: total.num_nanoseconds().unwrap_or(i64::MAX),
        }
    }

    /// The total as a [`TimeDelta`].
    pub fn duration(&self) -> TimeDelta {
        TimeDelta::nanoseconds(self.time_spent)
    }
}

/// Share of connections coming from one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CountryShare {
    /// Country name, `Unknown` when geolocation failed, `Other` for the
    /// remainder bucket.
    pub country: String,
    /// Percentage of all connections (0 to 100).
    pub percentage: f64,
}

/// Average number of concurrently connected players for one hour of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HourlyOnline {
    /// Hour of day in UTC (0 to 23).
    pub hour: u8,
    /// Average concurrent players during that hour across the observed days.
    pub concurrent_players_count: f64,
}

/// Live roster of the game server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayersInfo {
    /// Number of players the server reported.
    pub count: u8,
    /// One entry per reported player.
    #[serde(rename = "player")]
    pub players: Vec<PlayerInfo>,
}

/// One player in the live roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerInfo {
    /// Player name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Player score (usually frags).
    #[serde(rename = "Score")]
    pub score: i32,
    /// Seconds the player has been connected.
    #[serde(rename = "Duration")]
    pub duration: f32,
}
