//! Pivot data supplied with attach and sync requests.

use std::collections::BTreeMap;

use keel_core::{Attributes, EntityId, Value};
use keel_fields::filter_pivot;

/// Extra pivot attributes for the rows being written.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PivotData {
    /// No pivot attributes.
    #[default]
    None,
    /// The same attributes for every id.
    Uniform(Attributes),
    /// Attributes per related id. Ids without an entry get none.
    PerId(BTreeMap<EntityId, Attributes>),
}

impl PivotData {
    /// Interpret submitted pivot input.
    ///
    /// A map is keyed by id when every key is an identifier and every value
    /// is itself a map; otherwise it is applied uniformly. This means a
    /// uniform map whose keys all look like ids and whose values are all
    /// maps is read as keyed by id.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_map().filter(|map| !map.is_empty()) else {
            return PivotData::None;
        };

        let per_id: Option<BTreeMap<EntityId, Attributes>> = map
            .iter()
            .map(|(key, value)| {
                let id = EntityId::from_value(&Value::String(key.clone()))?;
                let attributes = value.as_map()?.clone();
                Some((id, attributes))
            })
            .collect();

        match per_id {
            Some(per_id) => PivotData::PerId(per_id),
            None => PivotData::Uniform(map.clone()),
        }
    }

    /// Attributes for one id, unfiltered.
    pub fn for_id(&self, id: EntityId) -> Attributes {
        match self {
            PivotData::None => Attributes::new(),
            PivotData::Uniform(attributes) => attributes.clone(),
            PivotData::PerId(per_id) => per_id.get(&id).cloned().unwrap_or_default(),
        }
    }

    /// Attributes for one id, restricted to the allowed pivot columns.
    /// Unknown keys are dropped silently.
    pub fn filtered_for(&self, id: EntityId, columns: &[String]) -> Attributes {
        filter_pivot(&self.for_id(id), columns)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PivotData::None)
    }
}
