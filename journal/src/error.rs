//! Journal error types.

use thiserror::Error;

/// Journal errors.
#[derive(Debug, Error)]
pub enum JournalError {
    /// IO error while writing or reading a log file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Event could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A line of a log file is not an event.
    #[error("invalid entry at line {line}: {message}")]
    InvalidEntry { line: usize, message: String },

    /// The sink's lock was poisoned by a panicking writer.
    #[error("event sink unavailable: {message}")]
    Unavailable { message: String },
}

impl JournalError {
    pub fn invalid_entry(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            line,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;
