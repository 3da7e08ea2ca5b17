//! Input validation against field-derived rules.

use std::collections::BTreeMap;
use std::fmt;

use keel_core::{Attributes, EntityId, Value};
use keel_store::Store;
use serde::{Deserialize, Serialize};

use crate::registry::ResourceRegistry;
use crate::rules::Rule;

/// Field-keyed validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(key.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of keys with at least one message.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, key: &str) -> &[String] {
        self.errors.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).first().map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.errors.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors
            .iter()
            .map(|(key, messages)| (key.as_str(), messages.as_slice()))
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }

    /// `Ok(())` when no message was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The given data was invalid.")?;
        for (key, messages) in &self.errors {
            write!(f, " {}: {}", key, messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Runs rules against request input.
///
/// A blank or absent value only faces `Required`; every other rule is
/// skipped for it. All failing rules of a key are reported, in rule order.
pub struct Validator<'a> {
    registry: &'a ResourceRegistry,
    store: &'a dyn Store,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a ResourceRegistry, store: &'a dyn Store) -> Self {
        Self { registry, store }
    }

    /// Validate input against rules keyed by input key, in order.
    pub fn validate(
        &self,
        input: &Attributes,
        rules: &[(String, Vec<Rule>)],
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (key, key_rules) in rules {
            let value = input.get(key).unwrap_or(&Value::Null);
            self.check_key(key, value, key_rules, &mut errors);
        }
        errors.into_result()
    }

    fn check_key(&self, key: &str, value: &Value, rules: &[Rule], errors: &mut ValidationErrors) {
        let numeric = rules
            .iter()
            .any(|rule| matches!(rule, Rule::Numeric | Rule::Integer));

        if value.is_blank() {
            if rules.contains(&Rule::Required) {
                errors.add(key, Rule::Required.message(key, value, numeric));
            }
            return;
        }

        for rule in rules {
            let passed = match rule.passes(value, numeric) {
                Some(passed) => passed,
                None => self.lookup(rule, value),
            };
            if !passed {
                errors.add(key, rule.message(key, value, numeric));
            }
        }
    }

    fn lookup(&self, rule: &Rule, value: &Value) -> bool {
        match rule {
            Rule::Exists { entity_type } => EntityId::from_value(value)
                .map_or(false, |id| self.exists(entity_type, id)),
            Rule::EachExists { entity_type } => {
                let items = match value {
                    Value::List(items) => items.as_slice(),
                    single => std::slice::from_ref(single),
                };
                items.iter().all(|item| {
                    EntityId::from_value(item).map_or(false, |id| self.exists(entity_type, id))
                })
            }
            Rule::MorphType { types } => value
                .as_str()
                .and_then(|alias| self.registry.resolve_morph_alias(alias.trim()))
                .map_or(false, |entity_type| types.iter().any(|t| t == entity_type)),
            _ => true,
        }
    }

    fn exists(&self, entity_type: &str, id: EntityId) -> bool {
        match self.store.load(entity_type, id) {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(entity_type = %entity_type, error = %e, "existence check failed");
                false
            }
        }
    }
}
