//! Display labels for related entities.

use keel_core::config::LabelConfig;
use keel_core::Entity;

use crate::relation::RelationField;
use crate::resource::Resource;

/// Label for a related entity.
///
/// Tried in order: the field's display callback, the field's display
/// attribute, the related resource's `display_label`, the first non-blank
/// attribute from the configured fallback list, and finally the identifier.
pub fn resolve_label(
    relation: &RelationField,
    related_resource: Option<&dyn Resource>,
    entity: &Entity,
    config: &LabelConfig,
) -> String {
    if let Some(callback) = relation.display_callback() {
        return callback(entity);
    }

    if let Some(attribute) = relation.display_attribute() {
        if let Some(label) = non_blank(entity, attribute) {
            return label;
        }
    }

    if let Some(label) = related_resource.and_then(|resource| resource.display_label(entity)) {
        return label;
    }

    config
        .fallback_attributes
        .iter()
        .find_map(|attribute| non_blank(entity, attribute))
        .unwrap_or_else(|| identifier(entity))
}

fn non_blank(entity: &Entity, attribute: &str) -> Option<String> {
    entity
        .get_attr(attribute)
        .filter(|value| !value.is_blank())
        .map(|value| value.to_text())
}

fn identifier(entity: &Entity) -> String {
    entity.id.map(|id| id.to_string()).unwrap_or_default()
}
