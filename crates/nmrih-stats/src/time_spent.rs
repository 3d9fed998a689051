//! Ranking of players by total time on the server.

use std::collections::HashMap;

use chrono::TimeDelta;
use nmrih_types::{EventRecord, TimeSpent};

use crate::session::SessionReconstructor;

/// Sum every session per nickname and return the `limit` longest totals.
///
/// Uses unfiltered sessions, so short visits still count. Ordered by
/// descending total; equal totals are ordered by nickname.
pub fn top_time_spent(records: &[EventRecord], limit: usize) -> Vec<TimeSpent> {
    let sessions = SessionReconstructor::unfiltered().reconstruct(records);

    let mut totals: HashMap<String, TimeDelta> = HashMap::new();
    for session in sessions {
        let duration = session.duration();
        totals
            .entry(session.nickname)
            .and_modify(|total| *total = total.checked_add(&duration).unwrap_or(TimeDelta::MAX))
            .or_insert(duration);
    }

    let mut ranked: Vec<(String, TimeDelta)> = totals.into_iter().collect();
    ranked.sort_unstable_by(|(a_nick, a), (b_nick, b)| b.cmp(a).then_with(|| a_nick.cmp(b_nick)));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|(nickname, total)| TimeSpent::new(nickname, total))
        .collect()
}
