//! File-system repositories for raw logs and canonical CSV snapshots.
//!
//! Raw logs are discovered with a glob pattern and read whole. Canonical
//! documents are written one file per ingestion run, named after the latest
//! record they contain:
//!
//! ```text
//! data/
//!   logs_2025-03-01_19-02-00.csv
//!   logs_2025-03-02_10-00-00.csv
//! ```
//!
//! The newest file name doubles as the low-water-mark for the next
//! incremental run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// File name prefix of canonical CSV snapshots.
const SNAPSHOT_PREFIX: &str = "logs_";

/// File name extension of canonical CSV snapshots.
const SNAPSHOT_EXTENSION: &str = ".csv";

/// Timestamp layout embedded in snapshot file names.
const SNAPSHOT_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

// ---------------------------------------------------------------------------
// Raw logs
// ---------------------------------------------------------------------------

/// Reads raw server log files matching a glob pattern.
#[derive(Debug, Clone)]
pub struct LogRepository {
    pattern: String,
}

impl LogRepository {
    /// Create a repository for files matching `pattern` (e.g. `logs/*.log`).
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Read every matching file, keyed by its path.
    ///
    /// No matches yields an empty map.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Pattern`] for an invalid pattern,
    /// [`StoreError::Glob`] if a match cannot be inspected, and
    /// [`StoreError::Io`] if a file cannot be read.
    pub async fn read_all(&self) -> Result<BTreeMap<String, Vec<u8>>, StoreError> {
        let mut files = BTreeMap::new();
        for entry in glob::glob(&self.pattern)? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| StoreError::io(&path, e))?;
            files.insert(path.display().to_string(), bytes);
        }
        debug!(pattern = %self.pattern, files = files.len(), "raw logs read");
        Ok(files)
    }
}

// ---------------------------------------------------------------------------
// Canonical CSV snapshots
// ---------------------------------------------------------------------------

/// Stores canonical CSV documents in a directory.
#[derive(Debug, Clone)]
pub struct CsvRepository {
    dir: PathBuf,
}

impl CsvRepository {
    /// Create a repository rooted at `dir`. The directory is created on the
    /// first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write one encoded document named after `last_timestamp`.
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created or the
    /// file cannot be written.
    pub async fn save(
        &self,
        bytes: &[u8],
        last_timestamp: DateTime<Utc>,
    ) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let path = self.dir.join(snapshot_file_name(last_timestamp));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        info!(path = %path.display(), bytes = bytes.len(), "canonical snapshot saved");
        Ok(path)
    }

    /// The latest timestamp encoded in an existing snapshot file name.
    ///
    /// Returns `None` when the directory is missing or holds no snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be listed.
    pub async fn last_saved_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let latest = self
            .snapshot_names()
            .await?
            .iter()
            .filter_map(|name| parse_snapshot_file_name(name))
            .max();
        Ok(latest)
    }

    /// Concatenate every snapshot in name order into one document.
    ///
    /// The header of every file after the first is dropped so the result
    /// decodes as a single document. Returns an empty buffer when there are
    /// no snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or a file cannot be read.
    pub async fn load_all(&self) -> Result<Vec<u8>, StoreError> {
        let mut combined = Vec::new();
        for (index, name) in self.snapshot_names().await?.iter().enumerate() {
            let path = self.dir.join(name);
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| StoreError::io(&path, e))?;

            let body = if index == 0 {
                bytes.as_slice()
            } else {
                skip_first_line(&bytes)
            };
            if body.is_empty() {
                continue;
            }
            if combined.last().is_some_and(|b| *b != b'\n') {
                combined.push(b'\n');
            }
            combined.extend_from_slice(body);
        }
        Ok(combined)
    }

    /// Names of snapshot files, sorted ascending. Other files are skipped
    /// with a warning.
    async fn snapshot_names(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if parse_snapshot_file_name(&name).is_some() {
                names.push(name);
            } else {
                warn!(file = %name, dir = %self.dir.display(), "skipping unrecognized file");
            }
        }
        names.sort_unstable();
        Ok(names)
    }
}

/// `logs_YYYY-MM-DD_HH-MM-SS.csv` for the given instant.
pub fn snapshot_file_name(at: DateTime<Utc>) -> String {
    format!(
        "{SNAPSHOT_PREFIX}{}{SNAPSHOT_EXTENSION}",
        at.format(SNAPSHOT_TIME_FORMAT)
    )
}

/// Inverse of [`snapshot_file_name`].
pub fn parse_snapshot_file_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(SNAPSHOT_EXTENSION)?;
    NaiveDateTime::parse_from_str(stamp, SNAPSHOT_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn skip_first_line(bytes: &[u8]) -> &[u8] {
    bytes
        .iter()
        .position(|b| *b == b'\n')
        .and_then(|newline| bytes.get(newline.saturating_add(1)..))
        .unwrap_or_default()
}
