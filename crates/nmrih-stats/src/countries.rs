//! Distribution of connections by country.

use std::collections::BTreeMap;

use nmrih_types::{Action, CountryShare, EventRecord};

/// Country reported for connections whose geolocation failed.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Name of the remainder bucket.
pub const OTHER_COUNTRY: &str = "Other";

/// Share of `connected` events per country for the `limit` most common
/// countries, followed by an `Other` bucket holding the remainder.
///
/// Countries with equal counts are ordered alphabetically. With no
/// connections at all the result is a single `Other` entry at 100%.
pub fn top_countries(records: &[EventRecord], limit: usize) -> Vec<CountryShare> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records.iter().filter(|r| r.action() == Action::Connected) {
        let country = record.country().unwrap_or(UNKNOWN_COUNTRY);
        let count = counts.entry(country).or_insert(0);
        *count = count.saturating_add(1);
    }
    let total = counts.values().fold(0_u64, |sum, n| sum.saturating_add(*n));

    let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
    // Stable sort keeps the alphabetical order among equal counts.
    ranked.sort_by(|(_, a), (_, b)| b.cmp(a));
    ranked.truncate(limit);

    let mut shares: Vec<CountryShare> = ranked
        .into_iter()
        .map(|(country, count)| CountryShare {
            country: country.to_owned(),
            percentage: percentage(count, total),
        })
        .collect();

    let selected: f64 = shares.iter().map(|share| share.percentage).sum();
    shares.push(CountryShare {
        country: String::from(OTHER_COUNTRY),
        percentage: 100.0 - selected,
    });
    shares
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    // Connection counts stay far below 2^52.
    #[allow(clippy::cast_precision_loss)]
    let ratio = count as f64 / total as f64;
    ratio * 100.0
}
