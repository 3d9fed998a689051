//! Error types for log ingestion.
//!
//! Ingestion is best effort: a bad line never aborts the batch. Every
//! per-line defect becomes a [`LineError`], per-file task failures become
//! [`IngestError::Task`], and the whole set is handed back to the caller as a
//! single joined [`IngestErrors`] value alongside the records that were
//! produced.

use std::fmt;

use nmrih_types::RecordError;

/// Errors from a geolocation lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeoError {
    /// The HTTP client could not be built or the request failed in transit.
    #[error("geolocation request failed: {0}")]
    Request(String),

    /// The service answered with a non-success HTTP status.
    #[error("geolocation service returned status {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("geolocation response could not be decoded: {0}")]
    Decode(String),

    /// The service reported that the address could not be resolved.
    #[error("geolocation lookup failed: {0}")]
    Lookup(String),
}

/// What went wrong on a single log line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineErrorKind {
    /// The line is too short to hold a timestamp at the fixed offset.
    #[error("line too short for timestamp")]
    TooShort,

    /// The timestamp text does not match `MM/DD/YYYY - HH:MM:SS`.
    #[error("failed to parse timestamp {text:?}: {source}")]
    Timestamp {
        /// The text found at the timestamp offset.
        text: String,
        /// The underlying parse error.
        source: chrono::ParseError,
    },

    /// No `<` follows the nickname offset.
    #[error("nickname delimiter '<' not found")]
    MissingNicknameDelimiter,

    /// A `connected` line carries no IPv4 address (strict mode only).
    #[error("no IP address found on connected line")]
    MissingAddress,

    /// The extracted fields do not form a valid record.
    #[error("invalid record: {0}")]
    Record(#[from] RecordError),

    /// The geolocation lookup for the line's address failed.
    #[error("failed to get country by IP [{ip}]: {source}")]
    Geo {
        /// The address that was looked up.
        ip: String,
        /// The underlying lookup error.
        source: GeoError,
    },
}

/// A defect on one line of one raw log file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file}:{line}: {kind}")]
pub struct LineError {
    /// Label of the file the line came from.
    pub file: String,
    /// 1-based line number.
    pub line: usize,
    /// What went wrong.
    pub kind: LineErrorKind,
}

/// A single failure collected during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// A line-level defect.
    #[error(transparent)]
    Line(#[from] LineError),

    /// The task scanning a file panicked or was cancelled.
    #[error("scanning {file} failed: {reason}")]
    Task {
        /// Label of the file whose task failed.
        file: String,
        /// Description of the failure.
        reason: String,
    },
}

/// Every failure of a best-effort ingestion run, joined into one error.
///
/// Displays one failure per line, in the order they were collected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestErrors(Vec<IngestError>);

impl IngestErrors {
    /// Wrap a list of failures; returns `None` when the list is empty.
    pub fn join(errors: Vec<IngestError>) -> Option<Self> {
        if errors.is_empty() { None } else { Some(Self(errors)) }
    }

    /// Iterate over the individual failures.
    pub fn iter(&self) -> impl Iterator<Item = &IngestError> {
        self.0.iter()
    }

    /// Consume the joined error and return the individual failures.
    pub fn into_inner(self) -> Vec<IngestError> {
        self.0
    }
}

impl fmt::Display for IngestErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for IngestErrors {}
