//! Raw server log ingestion.
//!
//! Turns raw No More Room in Hell server console logs into
//! [`nmrih_types::EventRecord`]s: lines are classified by keyword, fields are
//! extracted at fixed offsets, `connected` lines are geolocated, and a batch
//! of files is processed concurrently under a bounded worker count.
//!
//! # Modules
//!
//! - [`scanner`] -- Per-line parsing and per-file scanning
//! - [`ingestor`] -- Bounded concurrent fan-out over a batch of files
//! - [`geo`] -- The [`GeoEnricher`] contract, ip-api.com client and memoization
//! - [`error`] -- Line, task and geolocation errors

pub mod error;
pub mod geo;
pub mod ingestor;
pub mod scanner;

pub use error::{GeoError, IngestError, IngestErrors, LineError, LineErrorKind};
pub use geo::{GeoEnricher, IpApiClient, MemoizedGeo};
pub use ingestor::{DEFAULT_MAX_CONCURRENCY, IngestOutcome, LogIngestor};
pub use scanner::{ParsedLine, RawLogScanner, ScanOutcome};
