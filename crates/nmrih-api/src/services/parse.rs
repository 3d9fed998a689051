//! Incremental ingestion run triggered by `GET /api/v1/parse`.
//!
//! ```text
//! last snapshot name ──> since ──> raw logs ──> LogIngestor ──> encode ──> save
//!                                                                   │
//!                                               invalidate graph cache
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use nmrih_ingest::{GeoEnricher, IngestErrors, LogIngestor};
use nmrih_store::{CsvRepository, LogRepository, ResponseCache, encode};
use nmrih_types::GraphType;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::ApiError;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ParseReport {
    /// Records written in this run.
    pub records: usize,
    /// Line and task errors collected during the run, in report order.
    pub errors: Vec<String>,
    /// The snapshot file written, if any records were produced.
    pub saved_as: Option<PathBuf>,
}

/// Reads new raw log activity and appends it as a canonical snapshot.
#[derive(Debug)]
pub struct ParseService<G> {
    logs: LogRepository,
    csv: CsvRepository,
    ingestor: LogIngestor<G>,
    cache: ResponseCache,
    default_since: DateTime<Utc>,
    running: Mutex<()>,
}

impl<G> ParseService<G>
where
    G: GeoEnricher + 'static,
{
    /// Create the service. `default_since` is the low-water-mark used
    /// before any snapshot has been saved.
    pub fn new(
        logs: LogRepository,
        csv: CsvRepository,
        ingestor: LogIngestor<G>,
        cache: ResponseCache,
        default_since: DateTime<Utc>,
    ) -> Self {
        Self {
            logs,
            csv,
            ingestor,
            cache,
            default_since,
            running: Mutex::new(()),
        }
    }

    /// Ingest everything newer than the latest snapshot.
    ///
    /// Runs are serialized so two concurrent triggers cannot ingest the same
    /// window twice. Line errors are reported in the result and logged; the
    /// run only fails on them when not a single record was produced.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Store`] or [`ApiError::Codec`] if reading,
    /// encoding or saving fails, and [`ApiError::Ingest`] if the run
    /// produced errors and no records.
    pub async fn run(&self) -> Result<ParseReport, ApiError> {
        let _guard = self.running.lock().await;

        let since = self.csv.last_saved_at().await?.unwrap_or(self.default_since);
        let files = self.logs.read_all().await?;
        info!(files = files.len(), %since, "parsing raw logs");

        let outcome = self.ingestor.ingest(files, since).await;
        let errors: Vec<String> = outcome
            .errors
            .iter()
            .flat_map(IngestErrors::iter)
            .map(ToString::to_string)
            .collect();
        for error in &errors {
            warn!(%error, "ingestion error");
        }

        let Some(last) = outcome.records.iter().map(|record| record.timestamp()).max() else {
            return match outcome.errors {
                Some(errors) => Err(ApiError::Ingest(errors)),
                None => Ok(ParseReport {
                    records: 0,
                    errors,
                    saved_as: None,
                }),
            };
        };

        let bytes = encode(&outcome.records)?;
        let path = self.csv.save(&bytes, last).await?;
        self.invalidate_graphs().await;

        Ok(ParseReport {
            records: outcome.records.len(),
            errors,
            saved_as: Some(path),
        })
    }

    /// Drop every cached graph so the next request sees the new records.
    /// A cache failure leaves entries to expire on their TTL.
    async fn invalidate_graphs(&self) {
        let keys: Vec<String> = GraphType::ALL
            .into_iter()
            .filter(|graph| graph.is_cacheable())
            .map(GraphType::cache_key)
            .collect();
        if let Err(e) = self.cache.invalidate(&keys).await {
            warn!(error = %e, "failed to invalidate cached graphs");
        }
    }
}
