//! Field layer error types.

use keel_store::StoreError;
use thiserror::Error;

/// Result type for field layer operations.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors raised while building or looking up resources and fields.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Duplicate field key: {key} on resource {resource}")]
    DuplicateKey { resource: String, key: String },

    #[error("Field {name} on resource {resource} has no attribute")]
    MissingAttribute { resource: String, name: String },

    #[error("Duplicate resource: {entity_type}")]
    DuplicateResource { entity_type: String },

    #[error("Duplicate morph alias: {alias}")]
    DuplicateMorphAlias { alias: String },

    #[error("Unknown resource: {entity_type}")]
    UnknownResource { entity_type: String },

    #[error("Unknown field: {key} on resource {resource}")]
    UnknownField { resource: String, key: String },

    #[error("Hook failed: {message}")]
    Hook { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FieldError {
    pub fn duplicate_key(resource: impl Into<String>, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            resource: resource.into(),
            key: key.into(),
        }
    }

    pub fn missing_attribute(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingAttribute {
            resource: resource.into(),
            name: name.into(),
        }
    }

    pub fn unknown_resource(entity_type: impl Into<String>) -> Self {
        Self::UnknownResource {
            entity_type: entity_type.into(),
        }
    }

    pub fn unknown_field(resource: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownField {
            resource: resource.into(),
            key: key.into(),
        }
    }

    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook {
            message: message.into(),
        }
    }
}
