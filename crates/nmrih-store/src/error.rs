//! Error types for the storage layer.

use std::path::PathBuf;

/// Errors from encoding or decoding the canonical CSV document.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The document has no rows at all, so not even a header.
    #[error("canonical document is missing its header row")]
    MissingHeader,

    /// The CSV reader or writer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The CSV writer could not hand back its buffer.
    #[error("failed to flush CSV writer: {0}")]
    Flush(String),

    /// A row carries a timestamp that does not match `YYYY-MM-DD HH:MM:SS`.
    /// Aborts decoding of the whole document.
    #[error("row {row}: failed to parse timestamp {text:?}: {source}")]
    Timestamp {
        /// 1-based row number, header included.
        row: u64,
        /// The offending cell.
        text: String,
        /// The underlying parse error.
        source: chrono::ParseError,
    },
}

/// Errors from the file repositories and the response cache.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A file-system operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The raw log glob pattern is invalid.
    #[error("invalid log file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A path matched by the glob could not be inspected.
    #[error("failed to enumerate log files: {0}")]
    Glob(#[from] glob::GlobError),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A cache round trip did not finish within its deadline.
    #[error("cache operation timed out")]
    CacheTimeout(#[from] tokio::time::error::Elapsed),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
