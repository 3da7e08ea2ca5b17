//! Attribute diffs for action events.

use keel_core::config::JournalConfig;
use keel_core::{Attributes, Value};

/// Changed attributes as `(before, after)`.
///
/// A key is changed when its value differs between the snapshots; a key
/// missing on one side counts as null there.
pub fn diff(original: &Attributes, current: &Attributes) -> (Attributes, Attributes) {
    let mut before = Attributes::new();
    let mut after = Attributes::new();
    let keys = original.keys().chain(current.keys().filter(|key| !original.contains_key(*key)));
    for key in keys {
        let old = original.get(key).unwrap_or(&Value::Null);
        let new = current.get(key).unwrap_or(&Value::Null);
        if old != new {
            before.insert(key.clone(), old.clone());
            after.insert(key.clone(), new.clone());
        }
    }
    (before, after)
}

/// Masks sensitive attribute values.
#[derive(Debug, Clone)]
pub struct Redactor {
    attributes: Vec<String>,
    mask: String,
}

impl Redactor {
    pub fn new(config: &JournalConfig) -> Self {
        Self {
            attributes: config.redacted_attributes.clone(),
            mask: config.redaction_mask.clone(),
        }
    }

    pub fn is_redacted(&self, key: &str) -> bool {
        self.attributes.iter().any(|attribute| attribute == key)
    }

    /// Replace the value of every sensitive key with the mask.
    pub fn redact(&self, mut attributes: Attributes) -> Attributes {
        for (key, value) in attributes.iter_mut() {
            if self.is_redacted(key) {
                *value = Value::from(self.mask.as_str());
            }
        }
        attributes
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(&JournalConfig::default())
    }
}
