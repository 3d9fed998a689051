//! Graph payloads for `GET /api/v1/graph`.
//!
//! Cacheable graphs are served from the [`ResponseCache`] when present and
//! stored there after being computed. The cache is an accelerator only: a
//! failed or timed-out cache call is logged and the graph is computed from
//! the canonical snapshots instead.

use std::time::Duration;

use nmrih_query::A2sClient;
use nmrih_stats::StatsEngine;
use nmrih_store::{CsvRepository, ResponseCache, decode};
use nmrih_types::{EventRecord, GraphType};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::ApiError;

/// Builds graph responses from the canonical snapshots or the live roster.
#[derive(Debug)]
pub struct GraphService {
    csv: CsvRepository,
    engine: StatsEngine,
    roster: Option<A2sClient>,
    cache: ResponseCache,
    cache_ttl: Duration,
}

impl GraphService {
    /// Create the service. Without a roster client `players-info` answers
    /// with [`ApiError::RosterDisabled`].
    pub const fn new(
        csv: CsvRepository,
        engine: StatsEngine,
        roster: Option<A2sClient>,
        cache: ResponseCache,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            csv,
            engine,
            roster,
            cache,
            cache_ttl,
        }
    }

    /// The response body `{"data": ...}` for `graph`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the snapshots cannot be read or decoded, or
    /// if the live roster query fails.
    pub async fn graph(&self, graph: GraphType) -> Result<Value, ApiError> {
        if graph.is_cacheable()
            && let Some(cached) = self.cached(graph).await
        {
            return Ok(cached);
        }

        let body = json!({ "data": self.compute(graph).await? });

        if graph.is_cacheable() {
            self.store(graph, &body).await;
        }
        Ok(body)
    }

    async fn compute(&self, graph: GraphType) -> Result<Value, ApiError> {
        let data = match graph {
            GraphType::PlayersInfo => {
                let roster = self.roster.as_ref().ok_or(ApiError::RosterDisabled)?;
                serde_json::to_value(roster.players().await?)?
            }
            GraphType::TopTimeSpent => {
                serde_json::to_value(self.engine.top_time_spent(&self.records().await?))?
            }
            GraphType::TopCountries => {
                serde_json::to_value(self.engine.top_countries(&self.records().await?))?
            }
            GraphType::OnlineStatistics => {
                serde_json::to_value(self.engine.online_statistics(&self.records().await?))?
            }
        };
        Ok(data)
    }

    /// Every record saved so far; none before the first snapshot.
    async fn records(&self) -> Result<Vec<EventRecord>, ApiError> {
        let bytes = self.csv.load_all().await?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(decode(&bytes)?)
    }

    async fn cached(&self, graph: GraphType) -> Option<Value> {
        let key = graph.cache_key();
        match self.cache.get(&key).await {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(value) => {
                    debug!(key, "graph served from cache");
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "discarding unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed");
                None
            }
        }
    }

    async fn store(&self, graph: GraphType, body: &Value) {
        let key = graph.cache_key();
        if let Err(e) = self.cache.set(&key, &body.to_string(), self.cache_ttl).await {
            warn!(key, error = %e, "cache write failed");
        }
    }
}
