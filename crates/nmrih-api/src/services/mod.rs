//! Request orchestration behind the HTTP handlers.
//!
//! - [`parse`] -- Incremental ingestion into canonical snapshots
//! - [`graph`] -- Graph payloads with response caching

pub mod graph;
pub mod parse;

pub use graph::GraphService;
pub use parse::{ParseReport, ParseService};
