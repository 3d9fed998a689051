//! Service entry point for the NMRiH server log analytics.
//!
//! Reads raw No More Room in Hell server logs, stores them as canonical CSV
//! snapshots, and serves player statistics over HTTP.
//!
//! # Architecture
//!
//! ```text
//! logs/*.log --> ParseService --> data/logs_<ts>.csv --> GraphService --> JSON
//!                    |                                       |      |
//!               ip-api.com                          ResponseCache  A2S query
//! ```

mod config;
mod error;

use std::sync::Arc;

use nmrih_api::{AppState, GraphService, ParseService, start_server};
use nmrih_ingest::{IpApiClient, LogIngestor, MemoizedGeo, RawLogScanner};
use nmrih_query::A2sClient;
use nmrih_stats::{StatsConfig, StatsEngine};
use nmrih_store::{CsvRepository, LogRepository, ResponseCache};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServiceConfig;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// wires the services together and serves HTTP until `Ctrl-C`.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server cannot start.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("nmrih-server starting");

    let config = ServiceConfig::from_env()?;
    info!(
        logs = config.logs_file_pattern,
        storage = %config.csv_storage_directory.display(),
        max_concurrency = config.ingest_max_concurrency,
        require_connect_address = config.require_connect_address,
        "configuration loaded"
    );

    let cache = connect_cache(&config).await;

    let geo = MemoizedGeo::new(IpApiClient::new(config.ip_api_url.as_str(), config.geo_timeout)?);
    let scanner = RawLogScanner::new(config.require_connect_address)?;
    let ingestor = LogIngestor::new(scanner, Arc::new(geo), config.ingest_max_concurrency);
    let csv = CsvRepository::new(&config.csv_storage_directory);

    let parse = ParseService::new(
        LogRepository::new(config.logs_file_pattern.as_str()),
        csv.clone(),
        ingestor,
        cache.clone(),
        config.ingest_default_since,
    );

    let roster = config.game_server.as_ref().map(|server| {
        let client = A2sClient::new(&server.host, server.port, config.query_timeout);
        info!(addr = client.addr(), "live roster enabled");
        client
    });
    if roster.is_none() {
        info!("live roster disabled, SERVER_ADDR not set");
    }

    let engine = StatsEngine::new(StatsConfig {
        min_session: config.min_session,
        ..StatsConfig::default()
    });
    let graph = GraphService::new(csv, engine, roster, cache, config.graph_cache_ttl);

    let mut state = AppState::new(parse, graph);
    if let Some(origin) = config.cors_allow_origin {
        state = state.with_cors_allow_origin(origin);
    }

    start_server(&config.server, Arc::new(state)).await?;

    info!("nmrih-server stopped");
    Ok(())
}

/// Human-readable logs by default, JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// The configured Dragonfly cache, or an in-memory one when none is set or
/// it cannot be reached.
async fn connect_cache(config: &ServiceConfig) -> ResponseCache {
    let Some(url) = config.dragonfly_url.as_deref() else {
        info!("using in-memory graph cache");
        return ResponseCache::memory(config.graph_cache_timeout);
    };
    match ResponseCache::connect(url, config.graph_cache_timeout).await {
        Ok(cache) => cache,
        Err(e) => {
            warn!(error = %e, "Dragonfly unavailable, using in-memory graph cache");
            ResponseCache::memory(config.graph_cache_timeout)
        }
    }
}
