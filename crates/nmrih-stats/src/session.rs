//! Reconstruction of `[start, end)` sessions from connect/disconnect events.
//!
//! One chronological pass drives a two-state machine per nickname:
//!
//! ```text
//!            connected                     disconnected
//!   Idle ----------------> Connected(t0) ----------------> Idle   emit [t0, t)
//!                            |      ^
//!                            +------+ connected again      emit [t0, last activity before t)
//! ```
//!
//! A second `connected` without a `disconnected` in between means the
//! disconnect line was lost. The nickname's latest activity strictly before
//! the new connect stands in for the missing disconnect. Nicknames still
//! connected when the stream ends are closed at their latest activity.
//!
//! Records are sorted with an unstable sort, so events of one nickname that
//! share a timestamp are processed in unspecified order.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use nmrih_types::{Action, EventRecord, Session};

/// Per-nickname progress through the stream.
#[derive(Debug, Default)]
struct Track {
    /// Start of the open session, if connected.
    open: Option<DateTime<Utc>>,
    /// Latest timestamp seen for this nickname.
    latest: Option<DateTime<Utc>>,
    /// Greatest timestamp strictly before `latest`.
    earlier: Option<DateTime<Utc>>,
}

impl Track {
    /// Latest activity strictly before `at`.
    fn last_before(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.latest {
            Some(latest) if latest < at => Some(latest),
            _ => self.earlier.filter(|earlier| *earlier < at),
        }
    }

    fn observe(&mut self, at: DateTime<Utc>) {
        match self.latest {
            Some(latest) if latest >= at => {}
            previous => {
                self.earlier = previous;
                self.latest = Some(at);
            }
        }
    }
}

/// Builds sessions from an event stream, optionally discarding short ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReconstructor {
    min_duration: TimeDelta,
}

impl Default for SessionReconstructor {
    fn default() -> Self {
        Self::unfiltered()
    }
}

impl SessionReconstructor {
    /// Keep every session, however short.
    pub const fn unfiltered() -> Self {
        Self {
            min_duration: TimeDelta::zero(),
        }
    }

    /// Drop sessions shorter than `min_duration`.
    pub const fn with_min_duration(min_duration: TimeDelta) -> Self {
        Self { min_duration }
    }

    /// Reconstruct sessions from `records`, in any order.
    ///
    /// Every action counts as activity for the nickname; only `connected`
    /// and `disconnected` open and close sessions. Sessions closed during
    /// the pass come first in close order, followed by sessions closed at
    /// end of stream ordered by nickname.
    pub fn reconstruct<'a, I>(&self, records: I) -> Vec<Session>
    where
        I: IntoIterator<Item = &'a EventRecord>,
    {
        let mut ordered: Vec<&EventRecord> = records.into_iter().collect();
        ordered.sort_unstable_by_key(|record| record.timestamp());

        let mut tracks: BTreeMap<&str, Track> = BTreeMap::new();
        let mut sessions = Vec::new();

        for record in ordered {
            let at = record.timestamp();
            let nickname = record.nickname();
            let track = tracks.entry(nickname).or_default();

            match (record.action(), track.open) {
                (Action::Connected, None) => track.open = Some(at),
                (Action::Connected, Some(start)) => {
                    if let Some(end) = track.last_before(at) {
                        self.push(&mut sessions, nickname, start, end);
                    }
                    track.open = Some(at);
                }
                (Action::Disconnected, Some(start)) => {
                    self.push(&mut sessions, nickname, start, at);
                    track.open = None;
                }
                _ => {}
            }
            track.observe(at);
        }

        for (nickname, track) in tracks {
            if let (Some(start), Some(end)) = (track.open, track.latest) {
                self.push(&mut sessions, nickname, start, end);
            }
        }

        sessions
    }

    fn push(
        &self,
        sessions: &mut Vec<Session>,
        nickname: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) {
        if let Some(session) = Session::new(nickname, start, end)
            && session.duration() >= self.min_duration
        {
            sessions.push(session);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, minute, 0).unwrap()
    }

    fn ev(nick: &str, hour: u32, minute: u32, action: Action) -> EventRecord {
        EventRecord::new(at(hour, minute), nick, action).unwrap()
    }

    fn spans(sessions: &[Session]) -> Vec<(&str, DateTime<Utc>, DateTime<Utc>)> {
        sessions
            .iter()
            .map(|s| (s.nickname.as_str(), s.start, s.end))
            .collect()
    }

    #[test]
    fn connect_then_disconnect() {
        let records = [
            ev("bob", 10, 0, Action::Connected),
            ev("bob", 11, 0, Action::Disconnected),
        ];
        let sessions = SessionReconstructor::unfiltered().reconstruct(&records);
        assert_eq!(spans(&sessions), [("bob", at(10, 0), at(11, 0))]);
    }

    #[test]
    fn input_order_does_not_matter() {
        let records = [
            ev("bob", 11, 0, Action::Disconnected),
            ev("bob", 10, 0, Action::Connected),
        ];
        let sessions = SessionReconstructor::unfiltered().reconstruct(&records);
        assert_eq!(spans(&sessions), [("bob", at(10, 0), at(11, 0))]);
    }

    #[test]
    fn disconnect_while_idle_is_ignored() {
        let records = [
            ev("bob", 9, 0, Action::Disconnected),
            ev("bob", 10, 0, Action::Connected),
            ev("bob", 10, 30, Action::Disconnected),
            ev("bob", 10, 40, Action::Disconnected),
        ];
        let sessions = SessionReconstructor::unfiltered().reconstruct(&records);
        assert_eq!(spans(&sessions), [("bob", at(10, 0), at(10, 30))]);
    }

    #[test]
    fn reconnect_closes_at_last_activity() {
        let records = [
            ev("bob", 10, 0, Action::Connected),
            ev("bob", 10, 5, Action::Entered),
            ev("bob", 10, 45, Action::CommittedSuicide),
            ev("bob", 12, 0, Action::Connected),
            ev("bob", 13, 0, Action::Disconnected),
        ];
        let sessions = SessionReconstructor::unfiltered().reconstruct(&records);
        assert_eq!(
            spans(&sessions),
            [("bob", at(10, 0), at(10, 45)), ("bob", at(12, 0), at(13, 0))]
        );
    }

    #[test]
    fn reconnect_without_prior_activity_drops_stale_state() {
        let records = [
            ev("bob", 10, 0, Action::Connected),
            ev("bob", 10, 20, Action::Connected),
            ev("bob", 11, 0, Action::Disconnected),
        ];
        let sessions = SessionReconstructor::unfiltered().reconstruct(&records);
        assert_eq!(spans(&sessions), [("bob", at(10, 20), at(11, 0))]);
    }

    #[test]
    fn open_sessions_close_at_latest_activity() {
        let records = [
            ev("zed", 8, 0, Action::Connected),
            ev("zed", 9, 30, Action::Entered),
            ev("amy", 8, 0, Action::Connected),
            ev("amy", 8, 50, Action::CommittedSuicide),
            ev("lonely", 8, 0, Action::Connected),
        ];
        let sessions = SessionReconstructor::unfiltered().reconstruct(&records);
        assert_eq!(
            spans(&sessions),
            [("amy", at(8, 0), at(8, 50)), ("zed", at(8, 0), at(9, 30))]
        );
    }

    #[test]
    fn nicknames_are_independent() {
        let records = [
            ev("a", 10, 0, Action::Connected),
            ev("b", 10, 10, Action::Connected),
            ev("a", 10, 20, Action::Disconnected),
            ev("b", 10, 30, Action::Disconnected),
        ];
        let sessions = SessionReconstructor::unfiltered().reconstruct(&records);
        assert_eq!(
            spans(&sessions),
            [("a", at(10, 0), at(10, 20)), ("b", at(10, 10), at(10, 30))]
        );
    }

    #[test]
    fn minimum_duration_is_inclusive() {
        let records = [
            ev("short", 10, 0, Action::Connected),
            ev("short", 10, 9, Action::Disconnected),
            ev("exact", 10, 0, Action::Connected),
            ev("exact", 10, 10, Action::Disconnected),
        ];
        let sessions =
            SessionReconstructor::with_min_duration(TimeDelta::minutes(10)).reconstruct(&records);
        assert_eq!(spans(&sessions), [("exact", at(10, 0), at(10, 10))]);
    }

    #[test]
    fn track_remembers_strictly_earlier_activity() {
        let mut track = Track::default();
        track.observe(at(10, 0));
        track.observe(at(10, 5));
        track.observe(at(10, 5));
        assert_eq!(track.last_before(at(10, 5)), Some(at(10, 0)));
        assert_eq!(track.last_before(at(11, 0)), Some(at(10, 5)));
        assert_eq!(track.last_before(at(10, 0)), None);
    }
}
