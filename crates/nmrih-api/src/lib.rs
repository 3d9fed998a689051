//! Stats API server for the NMRiH server log analytics.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`/health-check`** for liveness probes
//! - **`/api/v1/parse`** which ingests raw log lines newer than the latest
//!   canonical snapshot and saves them as a new snapshot
//! - **`/api/v1/graph`** which serves derived statistics (time spent,
//!   countries, hourly online players) and the live roster
//!
//! # Architecture
//!
//! Handlers are thin: they extract parameters and delegate to
//! [`ParseService`] or [`GraphService`] held in the shared [`AppState`].
//! Cacheable graphs go through the response cache, which the parse service
//! invalidates after every snapshot it writes.
//!
//! [`ParseService`]: services::ParseService
//! [`GraphService`]: services::GraphService

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod services;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use services::{GraphService, ParseReport, ParseService};
pub use state::AppState;
