//! Closed enumerations shared across the workspace.
//!
//! [`Action`] is the player activity recognized in raw server logs and
//! persisted in the canonical CSV. [`GraphType`] names the derived views the
//! stats API can serve.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::record::RecordError;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A player activity extracted from a log line.
///
/// The textual form (see [`Action::as_str`]) is both the keyword searched for
/// in raw log lines and the value written to the `Action` CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Action {
    /// The player joined the server.
    Connected,
    /// The player left the server.
    Disconnected,
    /// The player entered the game after connecting.
    Entered,
    /// The player killed their own character.
    #[serde(rename = "committed suicide")]
    CommittedSuicide,
}

impl Action {
    /// Every action in raw-log classification order.
    ///
    /// `disconnected` contains `connected` as a substring, so it must be
    /// tested first.
    pub const CLASSIFICATION_ORDER: [Self; 4] = [
        Self::Disconnected,
        Self::Connected,
        Self::Entered,
        Self::CommittedSuicide,
    ];

    /// The keyword / CSV spelling of this action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Entered => "entered",
            Self::CommittedSuicide => "committed suicide",
        }
    }

    /// Classify a raw log line by keyword containment.
    ///
    /// Returns `None` for lines that carry none of the keywords; those lines
    /// are not of interest and are dropped without error.
    pub fn classify(line: &str) -> Option<Self> {
        Self::CLASSIFICATION_ORDER
            .into_iter()
            .find(|action| line.contains(action.as_str()))
    }

    /// Whether this action opens or closes a session.
    pub const fn is_session_boundary(self) -> bool {
        matches!(self, Self::Connected | Self::Disconnected)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected" => Ok(Self::Connected),
            "disconnected" => Ok(Self::Disconnected),
            "entered" => Ok(Self::Entered),
            "committed suicide" => Ok(Self::CommittedSuicide),
            other => Err(RecordError::UnknownAction(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// GraphType
// ---------------------------------------------------------------------------

/// A derived view served by the `/api/v1/graph` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum GraphType {
    /// Players ranked by total time on the server.
    TopTimeSpent,
    /// Connection share per country.
    #[serde(rename = "top-country")]
    TopCountries,
    /// Live roster queried from the game server.
    PlayersInfo,
    /// Average concurrent players per hour of day.
    OnlineStatistics,
}

impl GraphType {
    /// Every graph type.
    pub const ALL: [Self; 4] = [
        Self::TopTimeSpent,
        Self::TopCountries,
        Self::PlayersInfo,
        Self::OnlineStatistics,
    ];

    /// The query-string spelling of this graph type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopTimeSpent => "top-time-spent",
            Self::TopCountries => "top-country",
            Self::PlayersInfo => "players-info",
            Self::OnlineStatistics => "online-statistics",
        }
    }

    /// Whether responses for this graph may be served from the cache.
    ///
    /// The live roster changes second to second and is never cached.
    pub const fn is_cacheable(self) -> bool {
        !matches!(self, Self::PlayersInfo)
    }

    /// Cache key under which this graph's response is stored.
    pub fn cache_key(self) -> String {
        format!("graph_data:{}", self.as_str())
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a graph type string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid graph type: {0}")]
pub struct UnknownGraphType(pub String);

impl FromStr for GraphType {
    type Err = UnknownGraphType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|graph| graph.as_str() == s)
            .ok_or_else(|| UnknownGraphType(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_wins_over_connected() {
        let line = r#"L 03/01/2025 - 12:00:00: "Bob<3><STEAM_1:0:1><>" disconnected (reason "Disconnect")"#;
        assert_eq!(Action::classify(line), Some(Action::Disconnected));
    }

    #[test]
    fn classify_each_keyword() {
        assert_eq!(Action::classify("x connected, address"), Some(Action::Connected));
        assert_eq!(Action::classify("x entered the game"), Some(Action::Entered));
        assert_eq!(
            Action::classify("x committed suicide with \"world\""),
            Some(Action::CommittedSuicide)
        );
        assert_eq!(Action::classify("server cvar \"mp_timelimit\""), None);
    }

    #[test]
    fn action_text_round_trips() {
        for action in Action::CLASSIFICATION_ORDER {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!("kicked".parse::<Action>().is_err());
    }

    #[test]
    fn action_serializes_as_csv_spelling() {
        let json = serde_json::to_string(&Action::CommittedSuicide).unwrap();
        assert_eq!(json, "\"committed suicide\"");
    }

    #[test]
    fn graph_type_parsing() {
        assert_eq!("top-country".parse::<GraphType>().unwrap(), GraphType::TopCountries);
        assert_eq!(
            "online-statistics".parse::<GraphType>().unwrap(),
            GraphType::OnlineStatistics
        );
        assert!("top-countries".parse::<GraphType>().is_err());
    }

    #[test]
    fn players_info_is_not_cached() {
        assert!(!GraphType::PlayersInfo.is_cacheable());
        assert!(GraphType::TopTimeSpent.is_cacheable());
        assert_eq!(GraphType::TopTimeSpent.cache_key(), "graph_data:top-time-spent");
    }
}
