//! Shared type definitions for the NMRiH server log analytics.
//!
//! This crate is the single source of truth for the values that flow between
//! ingestion, storage, statistics and the HTTP API. Output types are exported
//! to `TypeScript` via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`enums`] -- [`Action`] and [`GraphType`]
//! - [`record`] -- [`EventRecord`] and the derived [`Session`]
//! - [`stats`] -- Result shapes of the statistics engine and live roster

pub mod enums;
pub mod record;
pub mod stats;

// Re-export all public types at crate root for convenience.
pub use enums::{Action, GraphType, UnknownGraphType};
pub use record::{EventRecord, RecordError, Session};
pub use stats::{CountryShare, HourlyOnline, PlayerInfo, PlayersInfo, TimeSpent};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the dashboard types.

    #[test]
    fn export_bindings() {
        // ts-rs writes the files to `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::enums::Action::export_all();
        let _ = crate::enums::GraphType::export_all();
        let _ = crate::stats::TimeSpent::export_all();
        let _ = crate::stats::CountryShare::export_all();
        let _ = crate::stats::HourlyOnline::export_all();
        let _ = crate::stats::PlayersInfo::export_all();
        let _ = crate::stats::PlayerInfo::export_all();
    }
}
