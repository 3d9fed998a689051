//! Error types for service start-up.

/// Errors raised while reading the service configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("invalid {name}={value:?}: {reason}")]
    Invalid {
        /// The variable name.
        name: &'static str,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, value: &str, reason: String) -> Self {
        Self::Invalid {
            name,
            value: value.to_owned(),
            reason,
        }
    }
}
