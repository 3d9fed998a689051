//! Round-trip checks of the canonical codec over seeded random record sets.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use nmrih_store::{decode, encode};
use nmrih_types::{Action, EventRecord};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const NICKS: [&str; 7] = [
    "alice",
    "Bob, \"the\" Zed",
    "Ünïcødé",
    "multi\nline",
    "  padded  ",
    "#hash",
    "semi;colon",
];
const ADDRESSES: [&str; 3] = ["85.12.34.56", "24.48.0.1", "10.0.0.7"];
const COUNTRIES: [&str; 3] = ["Russia", "Canada", "Côte d'Ivoire"];

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
}

/// Records with sub-second timestamps, colliding instants, and optional
/// enrichment.
fn random_records(seed: u64, len: usize) -> Vec<EventRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let at = base()
                + TimeDelta::seconds(rng.random_range(0..3 * 86_400))
                + TimeDelta::milliseconds(rng.random_range(0..1_000));
            let nick = NICKS[rng.random_range(0..NICKS.len())];
            let action = Action::CLASSIFICATION_ORDER
                [rng.random_range(0..Action::CLASSIFICATION_ORDER.len())];
            let record = EventRecord::new(at, nick, action).unwrap();
            if action == Action::Connected && rng.random_bool(0.8) {
                record
                    .with_ip_address(ADDRESSES[rng.random_range(0..ADDRESSES.len())])
                    .with_country(COUNTRIES[rng.random_range(0..COUNTRIES.len())])
            } else {
                record
            }
        })
        .collect()
}

#[test]
fn decode_inverts_encode() {
    for seed in 0..50 {
        let records = random_records(seed, 1 + usize::try_from(seed).unwrap() * 4);
        let mut expected = records.clone();
        expected.sort_by_key(EventRecord::timestamp);

        let decoded = decode(&encode(&records).unwrap()).unwrap();
        assert_eq!(decoded, expected, "seed {seed}");
    }
}

#[test]
fn snapshot_is_sorted_by_timestamp() {
    for seed in 0..20 {
        let bytes = encode(&random_records(seed, 40)).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert!(
            decoded.windows(2).all(|pair| pair[0].timestamp() <= pair[1].timestamp()),
            "seed {seed}"
        );
        assert!(decoded.iter().all(|r| r.timestamp().timestamp_subsec_nanos() == 0));
    }
}
