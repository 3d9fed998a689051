//! Live roster queries against a Source engine game server.
//!
//! Implements the client half of `A2S_PLAYER` with the challenge handshake,
//! limited to single-packet responses, which covers any server with fewer
//! than roughly sixty players.
//!
//! # Modules
//!
//! - [`protocol`] -- Request encoding and response decoding
//! - [`client`] -- [`A2sClient`], the UDP exchange under a deadline
//! - [`error`] -- [`QueryError`]

pub mod client;
pub mod error;
pub mod protocol;

pub use client::A2sClient;
pub use error::QueryError;
