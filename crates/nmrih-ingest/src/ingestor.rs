//! Concurrent ingestion of a batch of raw log files.
//!
//! Each file is scanned on its own task inside a [`JoinSet`]. A shared
//! [`Semaphore`] caps how many files are in flight at once, which also caps
//! the number of concurrent geolocation lookups. Results are merged back in
//! file order once every task has finished, so the output does not depend on
//! task scheduling.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nmrih_types::EventRecord;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::{IngestError, IngestErrors};
use crate::geo::GeoEnricher;
use crate::scanner::{RawLogScanner, ScanOutcome};

/// Default cap on files scanned concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;

/// Records produced by an ingestion run plus every failure encountered.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// All records, grouped by file in file-name order, each group in line
    /// order. Downstream consumers sort by timestamp themselves.
    pub records: Vec<EventRecord>,
    /// The joined failures, `None` when the run was clean.
    pub errors: Option<IngestErrors>,
}

/// Fans a batch of raw files out over bounded concurrent scanning tasks.
#[derive(Debug)]
pub struct LogIngestor<G> {
    scanner: RawLogScanner,
    geo: Arc<G>,
    max_concurrency: usize,
}

impl<G> LogIngestor<G>
where
    G: GeoEnricher + 'static,
{
    /// Create an ingestor. A `max_concurrency` of zero is treated as one.
    pub fn new(scanner: RawLogScanner, geo: Arc<G>, max_concurrency: usize) -> Self {
        Self {
            scanner,
            geo,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Scan every file and collect records strictly after `since`.
    ///
    /// Never fails as a whole: line defects and failed tasks are gathered
    /// into [`IngestOutcome::errors`] while every good record is kept.
    pub async fn ingest(
        &self,
        files: BTreeMap<String, Vec<u8>>,
        since: DateTime<Utc>,
    ) -> IngestOutcome {
        let file_count = files.len();
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut labels = HashMap::with_capacity(file_count);

        for (order, (file, bytes)) in files.into_iter().enumerate() {
            let scanner = self.scanner.clone();
            let geo = Arc::clone(&self.geo);
            let permits = Arc::clone(&permits);
            let label = file.clone();

            let handle = tasks.spawn(async move {
                // Acquire only fails on a closed semaphore; this one never is.
                let _permit = permits.acquire_owned().await.ok();
                let outcome = scanner.scan(&file, &bytes, since, geo.as_ref()).await;
                (order, outcome)
            });
            labels.insert(handle.id(), label);
        }

        let mut finished: Vec<(usize, ScanOutcome)> = Vec::with_capacity(file_count);
        let mut task_errors = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, result)) => finished.push(result),
                Err(e) => {
                    let file = labels
                        .remove(&e.id())
                        .unwrap_or_else(|| String::from("<unknown>"));
                    warn!(file = %file, error = %e, "scan task failed");
                    task_errors.push(IngestError::Task {
                        file,
                        reason: e.to_string(),
                    });
                }
            }
        }
        finished.sort_unstable_by_key(|(order, _)| *order);

        let mut records = Vec::new();
        let mut errors = Vec::new();
        for (_, outcome) in finished {
            records.extend(outcome.records);
            errors.extend(outcome.errors.into_iter().map(IngestError::Line));
        }
        errors.extend(task_errors);

        info!(
            files = file_count,
            records = records.len(),
            errors = errors.len(),
            "ingestion finished"
        );

        IngestOutcome {
            records,
            errors: IngestErrors::join(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::error::GeoError;

    /// Tracks the peak number of lookups running at the same time.
    #[derive(Default)]
    struct GaugeGeo {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl GeoEnricher for GaugeGeo {
        async fn lookup(&self, _ip: &str) -> Result<String, GeoError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(String::from("Finland"))
        }
    }

    fn connect_line(nick: &str, second: u32) -> String {
        format!(
            "L 03/01/2025 - 10:00:{second:02}: \"{nick}<1><STEAM_1:0:1><>\" connected, address \"85.0.0.{second}:27005\"\n"
        )
    }

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let geo = Arc::new(GaugeGeo::default());
        let ingestor = LogIngestor::new(RawLogScanner::new(false).unwrap(), Arc::clone(&geo), 2);

        let files: BTreeMap<String, Vec<u8>> = (0..8)
            .map(|i| (format!("{i}.log"), connect_line("p", i).into_bytes()))
            .collect();
        let outcome = ingestor.ingest(files, since()).await;

        assert_eq!(outcome.records.len(), 8);
        assert!(outcome.errors.is_none());
        assert!(geo.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn output_follows_file_order() {
        let geo = Arc::new(GaugeGeo::default());
        let ingestor = LogIngestor::new(RawLogScanner::new(false).unwrap(), geo, 4);

        let mut files = BTreeMap::new();
        files.insert(String::from("b.log"), connect_line("second", 1).into_bytes());
        files.insert(String::from("a.log"), connect_line("first", 2).into_bytes());
        let outcome = ingestor.ingest(files, since()).await;

        let nicks: Vec<&str> = outcome.records.iter().map(EventRecord::nickname).collect();
        assert_eq!(nicks, ["first", "second"]);
    }

    #[tokio::test]
    async fn zero_concurrency_still_progresses() {
        let ingestor = LogIngestor::new(
            RawLogScanner::new(false).unwrap(),
            Arc::new(GaugeGeo::default()),
            0,
        );
        let mut files = BTreeMap::new();
        files.insert(String::from("a.log"), connect_line("x", 3).into_bytes());
        assert_eq!(ingestor.ingest(files, since()).await.records.len(), 1);
    }
}
