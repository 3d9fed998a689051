//! The canonical CSV encoding of an [`EventRecord`] set.
//!
//! ```text
//! TimeStamp,NickName,Action,IPAddress,Country
//! 2000-12-31 00:00:00,test,connected,123.234.123.234,RU
//! 2001-12-31 01:00:00,test,disconnected,,
//! ```
//!
//! Encoding sorts by timestamp. Encoding nothing yields an empty byte
//! sequence rather than a header-only document, while decoding an empty byte
//! sequence fails with [`CodecError::MissingHeader`]; the two are
//! deliberately not inverse at the empty set.

use chrono::NaiveDateTime;
use nmrih_types::{Action, EventRecord};
use tracing::warn;

use crate::error::CodecError;

/// Column names of the canonical document, in order.
pub const HEADER: [&str; 5] = ["TimeStamp", "NickName", "Action", "IPAddress", "Country"];

/// Timestamp layout of the `TimeStamp` column (UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rows with fewer cells than this are skipped on decode.
const MIN_COLUMNS: usize = 4;

/// Encode records as a canonical CSV document, sorted ascending by
/// timestamp.
///
/// # Errors
///
/// Returns [`CodecError`] if the CSV writer fails.
pub fn encode(records: &[EventRecord]) -> Result<Vec<u8>, CodecError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let mut sorted: Vec<&EventRecord> = records.iter().collect();
    sorted.sort_by_key(|record| record.timestamp());

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for record in sorted {
        let timestamp = record.timestamp().format(TIMESTAMP_FORMAT).to_string();
        writer.write_record([
            timestamp.as_str(),
            record.nickname(),
            record.action().as_str(),
            record.ip_address().unwrap_or_default(),
            record.country().unwrap_or_default(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| CodecError::Flush(e.error().to_string()))
}

/// Decode a canonical CSV document.
///
/// The first row is the header and is not validated. Rows with fewer than
/// four cells, unknown actions, or fields that do not form a valid record
/// are skipped with a warning. Invalid UTF-8 inside a cell is replaced with
/// `U+FFFD` rather than rejecting the row.
///
/// # Errors
///
/// Returns [`CodecError::MissingHeader`] for a document with no rows and
/// [`CodecError::Timestamp`] for the first malformed timestamp, which aborts
/// the whole decode.
pub fn decode(bytes: &[u8]) -> Result<Vec<EventRecord>, CodecError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = reader.byte_records();
    match rows.next() {
        Some(header) => {
            header?;
        }
        None => return Err(CodecError::MissingHeader),
    }

    let mut records = Vec::new();
    for row in rows {
        let row = row?;
        let line = row.position().map_or(0, csv::Position::line);
        if std::str::from_utf8(row.as_slice()).is_err() {
            warn!(line, "replacing invalid UTF-8 in CSV row");
        }
        let cell = |index: usize| row.get(index).map(String::from_utf8_lossy);

        let (Some(timestamp), Some(nickname), Some(action), Some(ip)) =
            (cell(0), cell(1), cell(2), cell(3))
        else {
            warn!(line, columns = row.len(), min = MIN_COLUMNS, "skipping short CSV row");
            continue;
        };

        let timestamp = NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT)
            .map_err(|source| CodecError::Timestamp {
                row: line,
                text: timestamp.to_string(),
                source,
            })?
            .and_utc();

        let action = match action.parse::<Action>() {
            Ok(action) => action,
            Err(e) => {
                warn!(line, error = %e, "skipping CSV row with unknown action");
                continue;
            }
        };

        match EventRecord::new(timestamp, nickname, action) {
            Ok(record) => records.push(
                record
                    .with_ip_address(ip)
                    .with_country(cell(4).unwrap_or_default()),
            ),
            Err(e) => warn!(line, error = %e, "skipping invalid CSV row"),
        }
    }

    Ok(records)
}
