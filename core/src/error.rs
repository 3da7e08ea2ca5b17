//! Common error types for Keel.

use thiserror::Error;

/// Errors raised while loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid TOML for the config schema.
    #[error("invalid config document: {0}")]
    Parse(#[from] toml::de::Error),

    /// The document parsed but holds an unusable value.
    #[error("invalid config value: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn io(path: impl ToString, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
