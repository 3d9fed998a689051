//! Error types for the stats API.
//!
//! [`ApiError`] unifies every failure a request can hit into a single enum
//! that converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nmrih_ingest::IngestErrors;
use nmrih_query::QueryError;
use nmrih_store::{CodecError, StoreError};
use nmrih_types::UnknownGraphType;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The `type` query parameter is missing or not a known graph type.
    #[error("invalid graph type")]
    InvalidGraphType,

    /// Reading or writing files, or the cache, failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The canonical document could not be encoded or decoded.
    #[error("canonical record error: {0}")]
    Codec(#[from] CodecError),

    /// The live roster query failed.
    #[error("server query failed: {0}")]
    Query(#[from] QueryError),

    /// No game server is configured for the live roster.
    #[error("live roster is not configured")]
    RosterDisabled,

    /// Ingestion produced no records and at least one error.
    #[error("ingestion failed:\n{0}")]
    Ingest(IngestErrors),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<UnknownGraphType> for ApiError {
    fn from(_: UnknownGraphType) -> Self {
        Self::InvalidGraphType
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidGraphType => StatusCode::BAD_REQUEST,
            Self::RosterDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Query(QueryError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Store(_)
            | Self::Codec(_)
            | Self::Query(_)
            | Self::Ingest(_)
            | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
