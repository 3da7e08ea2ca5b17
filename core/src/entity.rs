//! Entity structure for Keel.
//!
//! An entity is one stored record of an entity type: an optional identifier
//! (absent until the first save) plus its attribute values. The entity keeps
//! the attribute snapshot it was loaded with so that updates can be diffed.

use crate::{Attributes, EntityId, Value};

/// A stored (or about to be stored) record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Entity type name (the storage table / resource model name).
    pub entity_type: String,
    /// Identifier, assigned by the store on first save.
    pub id: Option<EntityId>,
    /// Current attribute values.
    pub attributes: Attributes,
    /// Attribute values as last loaded from or written to storage.
    original: Attributes,
}

impl Entity {
    /// Create a new, unsaved entity of the given type.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: None,
            attributes: Attributes::new(),
            original: Attributes::new(),
        }
    }

    /// Create an entity as it exists in storage.
    pub fn stored(entity_type: impl Into<String>, id: EntityId, attributes: Attributes) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: Some(id),
            original: attributes.clone(),
            attributes,
        }
    }

    /// Builder-style attribute assignment for unsaved entities.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Returns true once the entity has been saved and carries an identifier.
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    /// Get an attribute value by name.
    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Get an attribute value, treating a missing attribute as null.
    pub fn attr_or_null(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.attributes.get(name).unwrap_or(&NULL)
    }

    /// Set an attribute value.
    pub fn set_attr(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    /// Remove an attribute.
    pub fn remove_attr(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// The attribute snapshot taken when the entity was loaded or last saved.
    pub fn original(&self) -> &Attributes {
        &self.original
    }

    /// Returns true if the attribute differs from its original value.
    pub fn is_dirty(&self, name: &str) -> bool {
        self.attributes.get(name) != self.original.get(name)
    }

    /// Attributes whose value differs from the original snapshot.
    ///
    /// Attributes removed since the snapshot are reported as null.
    pub fn dirty(&self) -> Attributes {
        let mut changed: Attributes = self
            .attributes
            .iter()
            .filter(|(name, value)| self.original.get(name.as_str()) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for name in self.original.keys() {
            if !self.attributes.contains_key(name) {
                changed.insert(name.clone(), Value::Null);
            }
        }
        changed
    }

    /// Mark the current attributes as persisted.
    pub fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }
}
