//! Relation error types.

use keel_core::EntityId;
use keel_fields::FieldError;
use keel_store::StoreError;
use thiserror::Error;

/// Result type for relation operations.
pub type RelationResult<T> = Result<T, RelationError>;

/// Errors raised by attachment services.
#[derive(Debug, Error)]
pub enum RelationError {
    #[error("{operation} is not supported by relation {relation}")]
    UnsupportedOperation { operation: String, relation: String },

    #[error("Attachment limit exceeded: {current} attached, limit {limit}, attempted {attempted}")]
    LimitExceeded {
        current: usize,
        limit: usize,
        attempted: usize,
    },

    #[error("Parent must be saved before changing relation {relation}")]
    ParentNotSaved { relation: String },

    #[error("Relation {relation} cannot be resolved")]
    UnresolvedRelation { relation: String },

    #[error("{entity_type} {id} not found")]
    RelatedNotFound { entity_type: String, id: EntityId },

    #[error("Field {key} is not a relation")]
    NotARelation { key: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Field(#[from] FieldError),
}

impl RelationError {
    pub fn unsupported(operation: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            relation: relation.into(),
        }
    }

    pub fn limit_exceeded(current: usize, limit: usize, attempted: usize) -> Self {
        Self::LimitExceeded {
            current,
            limit,
            attempted,
        }
    }

    pub fn parent_not_saved(relation: impl Into<String>) -> Self {
        Self::ParentNotSaved {
            relation: relation.into(),
        }
    }

    pub fn unresolved(relation: impl Into<String>) -> Self {
        Self::UnresolvedRelation {
            relation: relation.into(),
        }
    }

    pub fn related_not_found(entity_type: impl Into<String>, id: EntityId) -> Self {
        Self::RelatedNotFound {
            entity_type: entity_type.into(),
            id,
        }
    }
}
