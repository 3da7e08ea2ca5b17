//! Persist error types.

use keel_core::EntityId;
use keel_fields::{FieldError, ValidationErrors};
use keel_relation::RelationError;
use keel_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Result type for persist and attachment operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors surfaced to the caller of an operation.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The gate refused the action. Never says which rule failed.
    #[error("This action is unauthorized.")]
    Authorization,

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Attachment limit exceeded: {current} attached, limit {limit}, attempted {attempted}")]
    AttachmentLimitExceeded {
        current: usize,
        limit: usize,
        attempted: usize,
    },

    #[error("{message}")]
    UnsupportedOperation { message: String },

    /// Anything that went wrong inside the transaction. The underlying
    /// message is for logs; callers get the correlation id.
    #[error("persistence failure [{correlation_id}]: {message}")]
    Persistence { correlation_id: Uuid, message: String },

    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: EntityId },

    /// The resource or relation is not defined.
    #[error(transparent)]
    Definition(#[from] FieldError),
}

impl PersistError {
    pub fn not_found(entity_type: impl Into<String>, id: EntityId) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id,
        }
    }

    pub fn persistence(correlation_id: Uuid, message: impl Into<String>) -> Self {
        Self::Persistence {
            correlation_id,
            message: message.into(),
        }
    }

    /// True for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PersistError::Persistence { .. } | PersistError::Definition(_))
    }

    /// Text safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            PersistError::Authorization => "This action is unauthorized.".to_string(),
            PersistError::Validation(_) => "The given data was invalid.".to_string(),
            PersistError::AttachmentLimitExceeded { limit, .. } => {
                format!("Cannot attach more than {} related records.", limit)
            }
            PersistError::UnsupportedOperation { message } => message.clone(),
            PersistError::Persistence { correlation_id, .. } => format!(
                "The operation could not be completed. Reference: {}",
                correlation_id
            ),
            PersistError::NotFound { .. } => "The requested resource was not found.".to_string(),
            PersistError::Definition(e) => e.to_string(),
        }
    }

    /// Structured details for error envelopes.
    pub fn details(&self) -> serde_json::Value {
        match self {
            PersistError::Validation(errors) => serde_json::json!({ "errors": errors }),
            PersistError::AttachmentLimitExceeded {
                current,
                limit,
                attempted,
            } => serde_json::json!({
                "current": current,
                "limit": limit,
                "attempted": attempted,
            }),
            PersistError::Persistence { correlation_id, .. } => {
                serde_json::json!({ "correlationId": correlation_id.to_string() })
            }
            _ => serde_json::Value::Null,
        }
    }
}

// ========== Transactional Failures ==========

/// A failure inside the transactional window, before it is mapped for the caller.
#[derive(Debug, Error)]
pub(crate) enum StepError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Relation(#[from] RelationError),
}

impl StepError {
    pub(crate) fn into_persist(self, correlation_id: Uuid) -> PersistError {
        match self {
            StepError::Relation(RelationError::LimitExceeded {
                current,
                limit,
                attempted,
            }) => PersistError::AttachmentLimitExceeded {
                current,
                limit,
                attempted,
            },
            StepError::Relation(e @ RelationError::UnsupportedOperation { .. }) => {
                PersistError::UnsupportedOperation {
                    message: e.to_string(),
                }
            }
            other => PersistError::persistence(correlation_id, other.to_string()),
        }
    }
}

impl From<RelationError> for PersistError {
    /// Mapping for relation errors raised outside a transaction.
    fn from(e: RelationError) -> Self {
        StepError::Relation(e).into_persist(Uuid::new_v4())
    }
}
