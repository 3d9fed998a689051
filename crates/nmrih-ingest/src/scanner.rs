//! Raw server log scanning.
//!
//! A raw log line looks like:
//!
//! ```text
//! L 03/01/2025 - 18:22:11: "Bob<12><STEAM_1:0:123><>" connected, address "85.12.34.56:27005"
//! ```
//!
//! The action is recognized by keyword containment, the timestamp sits at a
//! fixed offset, and the nickname runs from a fixed offset up to the first
//! `<`. For `connected` lines the last dotted-quad on the line is the
//! player's address, which is geolocated through the [`GeoEnricher`].

use chrono::{DateTime, NaiveDateTime, Utc};
use nmrih_types::{Action, EventRecord};
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{LineError, LineErrorKind};
use crate::geo::GeoEnricher;

/// Byte offset where the timestamp starts.
const TIMESTAMP_START: usize = 2;

/// Byte offset one past the end of the timestamp.
const TIMESTAMP_END: usize = 23;

/// Layout of the raw timestamp (`MM/DD/YYYY - HH:MM:SS`).
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y - %H:%M:%S";

/// Byte offset where the nickname starts.
const NICKNAME_START: usize = 26;

/// Dotted-quad IPv4 pattern.
const IPV4_PATTERN: &str =
    r"\b(?:(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\.){3}(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\b";

/// Records and line errors produced from one file.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Well-formed records, in file order.
    pub records: Vec<EventRecord>,
    /// Line-level defects, in file order.
    pub errors: Vec<LineError>,
}

/// The fields of one recognized line, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// The record built from the line (no country yet).
    pub record: EventRecord,
    /// How many IPv4 addresses the line contained (`connected` lines only).
    pub address_matches: usize,
}

/// Splits raw log files into lines and extracts [`EventRecord`]s.
#[derive(Debug, Clone)]
pub struct RawLogScanner {
    ipv4: Regex,
    require_address: bool,
}

impl RawLogScanner {
    /// Create a scanner.
    ///
    /// With `require_address`, a `connected` line without an IPv4 address is
    /// a line error and the line is dropped; otherwise it is kept without an
    /// address and only a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns the regex error if the address pattern fails to compile.
    pub fn new(require_address: bool) -> Result<Self, regex::Error> {
        Ok(Self {
            ipv4: Regex::new(IPV4_PATTERN)?,
            require_address,
        })
    }

    /// Parse a single line without enrichment.
    ///
    /// Returns `Ok(None)` for lines that carry no action keyword and for
    /// lines whose timestamp is not strictly after `since`.
    pub fn parse_line(
        &self,
        line: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<ParsedLine>, LineErrorKind> {
        let Some(action) = Action::classify(line) else {
            return Ok(None);
        };

        let text = line
            .get(TIMESTAMP_START..TIMESTAMP_END)
            .ok_or(LineErrorKind::TooShort)?;
        let timestamp = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
            .map_err(|source| LineErrorKind::Timestamp {
                text: text.to_owned(),
                source,
            })?
            .and_utc();
        if timestamp <= since {
            return Ok(None);
        }

        let nickname = line
            .find('<')
            .and_then(|end| line.get(NICKNAME_START..end))
            .ok_or(LineErrorKind::MissingNicknameDelimiter)?;

        let mut record = EventRecord::new(timestamp, nickname, action)?;
        let mut address_matches = 0;
        if action == Action::Connected {
            let found: Vec<&str> = self.ipv4.find_iter(line).map(|m| m.as_str()).collect();
            address_matches = found.len();
            if let Some(ip) = found.last() {
                record = record.with_ip_address(*ip);
            }
        }

        Ok(Some(ParsedLine {
            record,
            address_matches,
        }))
    }

    /// Scan one raw file.
    ///
    /// Every line is processed independently: a defect on one line is
    /// recorded and the scan moves on. A failed geolocation lookup still
    /// emits the record, without a country, alongside the error.
    pub async fn scan<G: GeoEnricher + ?Sized>(
        &self,
        file: &str,
        bytes: &[u8],
        since: DateTime<Utc>,
        geo: &G,
    ) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        let text = String::from_utf8_lossy(bytes);

        for (index, raw) in text.lines().enumerate() {
            let line_no = index.saturating_add(1);
            let line = raw.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            let error = |kind| LineError {
                file: file.to_owned(),
                line: line_no,
                kind,
            };

            let parsed = match self.parse_line(line, since) {
                Ok(Some(parsed)) => parsed,
                Ok(None) => continue,
                Err(kind) => {
                    outcome.errors.push(error(kind));
                    continue;
                }
            };

            let mut record = parsed.record;
            if record.action() == Action::Connected {
                if parsed.address_matches > 1 {
                    warn!(
                        file,
                        line = line_no,
                        matches = parsed.address_matches,
                        "found more than one IP address, keeping the last"
                    );
                }
                match record.ip_address().map(ToOwned::to_owned) {
                    Some(ip) => match geo.lookup(&ip).await {
                        Ok(country) => record = record.with_country(country),
                        Err(source) => {
                            outcome.errors.push(error(LineErrorKind::Geo { ip, source }));
                        }
                    },
                    None if self.require_address => {
                        outcome.errors.push(error(LineErrorKind::MissingAddress));
                        continue;
                    }
                    None => {
                        warn!(file, line = line_no, "found no IP address on connected line");
                    }
                }
            }

            outcome.records.push(record);
        }

        debug!(
            file,
            records = outcome.records.len(),
            errors = outcome.errors.len(),
            "file scanned"
        );
        outcome
    }
}
