//! Axum router construction for the stats API.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use nmrih_ingest::GeoEnricher;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the stats API.
///
/// The router includes:
/// - `GET /health-check` -- liveness probe
/// - `GET /api/v1/parse` -- ingest new raw log activity
/// - `GET /api/v1/graph` -- derived graph by `type`
///
/// CORS allows the configured origin, or any origin when none is set.
pub fn build_router<G>(state: Arc<AppState<G>>) -> Router
where
    G: GeoEnricher + 'static,
{
    let origin = state
        .cors_allow_origin
        .clone()
        .map_or_else(AllowOrigin::any, AllowOrigin::exact);
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health-check", get(handlers::health_check))
        .route("/api/v1/parse", get(handlers::parse::<G>))
        .route("/api/v1/graph", get(handlers::graph::<G>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
