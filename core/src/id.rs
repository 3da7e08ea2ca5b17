//! Identity types for Keel entities.
//!
//! Identifiers are assigned by the storage driver on first save and are:
//! - Unique within their entity type
//! - Immutable once assigned
//! - Opaque to the field layer (only compared and echoed back)

use crate::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a stored entity within its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new EntityId from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Interpret submitted input as an identifier.
    ///
    /// Accepts positive integers and strings holding a positive integer,
    /// which is how ids arrive from form and JSON payloads alike.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) if *i > 0 => Some(Self(*i as u64)),
            Value::Float(f) if *f > 0.0 && f.fract() == 0.0 => Some(Self(*f as u64)),
            Value::String(s) => s.trim().parse::<u64>().ok().filter(|id| *id > 0).map(Self),
            _ => None,
        }
    }

    /// Interpret a list input (or a single scalar) as a list of identifiers.
    ///
    /// Entries that are not identifiers are dropped. Order is preserved and
    /// duplicates are removed keeping the first occurrence.
    pub fn list_from_value(value: &Value) -> Vec<Self> {
        let mut ids: Vec<Self> = Vec::new();
        let mut push = |id: Self| {
            if !ids.contains(&id) {
                ids.push(id);
            }
        };
        match value {
            Value::List(items) => {
                for item in items {
                    if let Some(id) = Self::from_value(item) {
                        push(id);
                    }
                }
            }
            other => {
                if let Some(id) = Self::from_value(other) {
                    push(id);
                }
            }
        }
        ids
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
