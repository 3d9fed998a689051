//! Listener for the stats API.
//!
//! The dashboard polls `/api/v1/graph` and an operator or cron job hits
//! `/api/v1/parse`; both share one [`AppState`]. The process serves until
//! `Ctrl-C`, then lets an in-flight parse run finish writing its snapshot.

use std::net::SocketAddr;
use std::sync::Arc;

use nmrih_ingest::GeoEnricher;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Where the stats API listens. Set from `HTTP_HOST` and `PORT`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind, `0.0.0.0` for every interface.
    pub host: String,
    /// HTTP port, distinct from the game server's query port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

/// Serve the stats API until `Ctrl-C`.
///
/// Pending parse and graph requests complete before this returns, so a
/// snapshot is never left half written by shutdown.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] for an unusable address and
/// [`ServerError::Serve`] if accepting connections fails.
pub async fn start_server<G>(
    config: &ServerConfig,
    state: Arc<AppState<G>>,
) -> Result<(), ServerError>
where
    G: GeoEnricher + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "stats API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("stats API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Why the stats API stopped before shutdown was requested.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The host/port pair is malformed or already taken.
    #[error("bind error: {0}")]
    Bind(String),

    /// The listener failed while accepting connections.
    #[error("serve error: {0}")]
    Serve(String),
}
