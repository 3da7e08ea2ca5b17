//! Store error types.

use keel_core::EntityId;
use thiserror::Error;

/// Storage driver errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No table is registered for the entity type or pivot table name.
    #[error("unknown table: {name}")]
    UnknownTable { name: String },

    /// The entity does not exist.
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: EntityId },

    /// No transaction is active.
    #[error("no transaction is active")]
    NoActiveTransaction,

    /// Transaction is already active.
    #[error("transaction already active")]
    AlreadyActive,

    /// Failure reported by the underlying storage backend.
    #[error("storage backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn unknown_table(name: impl Into<String>) -> Self {
        Self::UnknownTable { name: name.into() }
    }

    pub fn not_found(entity_type: impl Into<String>, id: EntityId) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id,
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
