//! The event record flowing through every stage, and the session interval
//! derived from it.
//!
//! An [`EventRecord`] is created once during ingestion, persisted in the
//! canonical CSV, and afterwards only read. Its invariants (timestamp after
//! the Unix epoch, non-empty nickname) are enforced by [`EventRecord::new`],
//! so a value of this type is always well formed. Timestamps are kept at
//! whole-second resolution, the resolution of both the raw log and the CSV.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

use crate::enums::Action;

/// Why an event record could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The timestamp is the zero instant (at or before the Unix epoch).
    #[error("invalid timestamp: {0}")]
    ZeroTimestamp(DateTime<Utc>),

    /// The nickname is empty.
    #[error("invalid nickname: empty")]
    EmptyNickname,

    /// The action text is not one of the known actions.
    #[error("invalid action: {0:?}")]
    UnknownAction(String),
}

/// One structured player-activity entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    timestamp: DateTime<Utc>,
    nickname: String,
    action: Action,
    ip_address: Option<String>,
    country: Option<String>,
}

impl EventRecord {
    /// Build a record, rejecting values that break the record invariants.
    ///
    /// Fractions of a second are truncated.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::ZeroTimestamp`] for a timestamp at or before
    /// the Unix epoch and [`RecordError::EmptyNickname`] for an empty
    /// nickname.
    pub fn new(
        timestamp: DateTime<Utc>,
        nickname: impl Into<String>,
        action: Action,
    ) -> Result<Self, RecordError> {
        let timestamp = timestamp.trunc_subsecs(0);
        if timestamp <= DateTime::<Utc>::UNIX_EPOCH {
            return Err(RecordError::ZeroTimestamp(timestamp));
        }
        let nickname = nickname.into();
        if nickname.is_empty() {
            return Err(RecordError::EmptyNickname);
        }
        Ok(Self {
            timestamp,
            nickname,
            action,
            ip_address: None,
            country: None,
        })
    }

    /// Attach the player's IP address. Empty strings are stored as absent.
    #[must_use]
    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = non_empty(ip.into());
        self
    }

    /// Attach the geolocated country. Empty strings are stored as absent.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = non_empty(country.into());
        self
    }

    /// When the activity happened (UTC).
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The player's nickname. Nicknames may be reused by different players.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// What the player did.
    pub const fn action(&self) -> Action {
        self.action
    }

    /// The address extracted from a `connected` line, if any.
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// The geolocated country of a `connected` line, if the lookup succeeded.
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// A `[start, end)` interval of continuous connectivity for one nickname.
///
/// Sessions are derived in memory during statistics computation and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The player's nickname.
    pub nickname: String,
    /// Connection instant (inclusive).
    pub start: DateTime<Utc>,
    /// Disconnection or last-activity instant (exclusive).
    pub end: DateTime<Utc>,
}

impl Session {
    /// Build a session; returns `None` unless `end > start`.
    pub fn new(nickname: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (end > start).then(|| Self {
            nickname: nickname.into(),
            start,
            end,
        })
    }

    /// Length of the session.
    pub fn duration(&self) -> TimeDelta {
        self.end.signed_duration_since(self.start)
    }
}
