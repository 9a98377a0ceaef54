//! Configuration loading and validation errors.

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value failed validation
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Field name
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The configuration document could not be parsed
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read
    #[error("failed to read configuration file: {0}")]
    Io(#[source] std::io::Error),
}

impl ConfigError {
    /// Create a [`ConfigError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
