//! Shared application state for the stats API.
//!
//! [`AppState`] owns the two services behind the endpoints. It is shared
//! behind an [`Arc`](std::sync::Arc) and never mutated after start-up; the
//! services synchronize internally where they need to.

use axum::http::HeaderValue;

use crate::services::{GraphService, ParseService};

/// State shared by every request handler.
#[derive(Debug)]
pub struct AppState<G> {
    /// Incremental ingestion behind `/api/v1/parse`.
    pub parse: ParseService<G>,
    /// Graph payloads behind `/api/v1/graph`.
    pub graph: GraphService,
    /// The single origin allowed by CORS. Any origin when `None`.
    pub cors_allow_origin: Option<HeaderValue>,
}

impl<G> AppState<G> {
    /// Create state that allows requests from any origin.
    pub const fn new(parse: ParseService<G>, graph: GraphService) -> Self {
        Self {
            parse,
            graph,
            cors_allow_origin: None,
        }
    }

    /// Restrict CORS to a single origin.
    #[must_use]
    pub fn with_cors_allow_origin(mut self, origin: HeaderValue) -> Self {
        self.cors_allow_origin = Some(origin);
        self
    }
}
