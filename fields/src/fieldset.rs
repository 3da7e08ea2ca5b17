//! Validated, ordered field collections.

use std::collections::HashSet;

use crate::context::VisibilityContext;
use crate::error::{FieldError, FieldResult};
use crate::field::{Field, FieldKind};

/// A resource's fields in declaration order, with unique keys.
#[derive(Debug, Clone)]
pub struct FieldSet {
    resource: String,
    fields: Vec<Field>,
}

impl FieldSet {
    /// Build a field set.
    ///
    /// Fails on duplicate keys and on scalar fields without an attribute.
    pub fn new(resource: impl Into<String>, fields: Vec<Field>) -> FieldResult<Self> {
        let resource = resource.into();
        let mut seen = HashSet::new();
        for field in &fields {
            if field.attribute().is_empty() && matches!(field.kind(), FieldKind::Scalar(_)) {
                return Err(FieldError::missing_attribute(&resource, field.name()));
            }
            if !seen.insert(field.key().to_string()) {
                return Err(FieldError::duplicate_key(&resource, field.key()));
            }
        }
        Ok(Self { resource, fields })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Fields visible in the context, in declaration order.
    pub fn visible_for(&self, context: VisibilityContext) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .filter(move |field| field.is_visible_for(context))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
