//! Storage layer for the NMRiH log analytics.
//!
//! Holds the boundary between in-memory [`nmrih_types::EventRecord`]s and
//! everything persisted or cached:
//!
//! ```text
//! logs/*.log ----> LogRepository::read_all ----> (ingestion)
//!                                                    |
//!                                              codec::encode
//!                                                    v
//! data/logs_<ts>.csv <---- CsvRepository::save <-----+
//!        |
//!        +--> CsvRepository::load_all --> codec::decode --> (statistics)
//!                                                              |
//!                           ResponseCache <--- graph JSON -----+
//! ```
//!
//! # Modules
//!
//! - [`codec`] -- Canonical CSV encode/decode
//! - [`repository`] -- Raw log discovery and canonical snapshot files
//! - [`cache`] -- In-memory or `Dragonfly` response cache with TTL
//! - [`error`] -- Codec and storage errors

pub mod cache;
pub mod codec;
pub mod error;
pub mod repository;

pub use cache::ResponseCache;
pub use codec::{decode, encode};
pub use error::{CodecError, StoreError};
pub use repository::{CsvRepository, LogRepository};
