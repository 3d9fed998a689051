//! Error types for live roster queries.

/// Errors from an `A2S_PLAYER` exchange.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The server address could not be resolved.
    #[error("failed to resolve server address {addr}: {reason}")]
    Resolve {
        /// The configured `host:port`.
        addr: String,
        /// Why resolution failed.
        reason: String,
    },

    /// A socket operation failed.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The server did not answer within the deadline.
    #[error("server query timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),

    /// The response ended before a complete field could be read.
    #[error("response truncated while reading {0}")]
    Truncated(&'static str),

    /// The response does not start with the single-packet prefix.
    #[error("unsupported packet prefix {0:#010x}")]
    UnsupportedPrefix(u32),

    /// The response carries a header byte other than challenge or players.
    #[error("unexpected response header {0:#04x}")]
    UnexpectedHeader(u8),

    /// The server kept answering with new challenges.
    #[error("server did not accept the challenge")]
    ChallengeRejected,
}
