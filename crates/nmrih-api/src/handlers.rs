//! HTTP endpoint handlers for the stats API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health-check` | Liveness probe |
//! | `GET` | `/api/v1/parse` | Ingest new raw log activity |
//! | `GET` | `/api/v1/graph?type=<graph-type>` | One derived graph |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use nmrih_ingest::GeoEnricher;
use nmrih_types::GraphType;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::AppState;

/// Message returned by a successful parse run.
pub const PARSED_MESSAGE: &str = "Logs have been parsed successfully";

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/v1/graph` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct GraphQuery {
    /// One of `top-time-spent`, `top-country`, `players-info`,
    /// `online-statistics`.
    #[serde(rename = "type")]
    pub graph_type: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /health-check
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "message": "OK" }))
}

// ---------------------------------------------------------------------------
// GET /api/v1/parse
// ---------------------------------------------------------------------------

/// Ingest raw log lines newer than the latest canonical snapshot.
///
/// Responds 200 with the record count and any line errors when at least
/// one record was produced or the logs held nothing new.
pub async fn parse<G>(State(state): State<Arc<AppState<G>>>) -> Result<Json<Value>, ApiError>
where
    G: GeoEnricher + 'static,
{
    let report = state.parse.run().await?;
    Ok(Json(json!({
        "message": PARSED_MESSAGE,
        "records": report.records,
        "errors": report.errors,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/v1/graph
// ---------------------------------------------------------------------------

/// Serve one graph as `{"data": ...}`.
pub async fn graph<G>(
    State(state): State<Arc<AppState<G>>>,
    Query(query): Query<GraphQuery>,
) -> Result<Json<Value>, ApiError>
where
    G: GeoEnricher + 'static,
{
    let graph: GraphType = query
        .graph_type
        .as_deref()
        .ok_or(ApiError::InvalidGraphType)?
        .parse()?;
    Ok(Json(state.graph.graph(graph).await?))
}
