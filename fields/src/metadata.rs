//! Relation metadata resolution.
//!
//! Before a relation is read or written, its metadata is resolved against
//! the registry and the storage driver. A relation whose related type or
//! pivot table is unknown yields `None`, and callers degrade to an empty
//! result instead of failing.

use std::sync::Arc;

use keel_store::Store;

use crate::field::Field;
use crate::registry::ResourceRegistry;
use crate::relation::{RelationField, RelationKind};
use crate::resource::Resource;

/// What is known about a relation for one parent entity type.
#[derive(Clone)]
pub struct RelationMetadata {
    /// Related entity type. Empty for `MorphTo`, whose target varies per entity.
    pub related_type: String,
    /// Resource registered for the related type, if any.
    pub related_resource: Option<Arc<dyn Resource>>,
    /// Alias written to morph type columns for the parent.
    pub parent_alias: String,
}

impl RelationMetadata {
    /// Resolve metadata for a relation field on `parent_type`.
    pub fn resolve(
        field: &Field,
        parent_type: &str,
        registry: &ResourceRegistry,
        store: &dyn Store,
    ) -> Option<Self> {
        let relation = field.as_relation()?;
        Self::resolve_relation(relation, parent_type, registry, store)
    }

    pub fn resolve_relation(
        relation: &RelationField,
        parent_type: &str,
        registry: &ResourceRegistry,
        store: &dyn Store,
    ) -> Option<Self> {
        let parent_alias = registry.morph_alias(parent_type).to_string();

        if let RelationKind::MorphTo { .. } = relation.kind() {
            return Some(Self {
                related_type: String::new(),
                related_resource: None,
                parent_alias,
            });
        }

        let related_type = relation.related_type();
        if !store.has_entity_type(related_type) {
            tracing::warn!(
                relation = %relation.relation_name(),
                related_type = %related_type,
                "relation points at an unknown entity type"
            );
            return None;
        }

        if let Some(pivot) = relation.kind().pivot() {
            if !store.has_pivot_table(&pivot.table) {
                tracing::warn!(
                    relation = %relation.relation_name(),
                    table = %pivot.table,
                    "relation pivot table is unknown"
                );
                return None;
            }
        }

        Some(Self {
            related_type: related_type.to_string(),
            related_resource: registry.resource(related_type).cloned(),
            parent_alias,
        })
    }

    pub fn related_resource(&self) -> Option<&dyn Resource> {
        self.related_resource.as_deref()
    }
}

impl std::fmt::Debug for RelationMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationMetadata")
            .field("related_type", &self.related_type)
            .field("related_resource", &self.related_resource.is_some())
            .field("parent_alias", &self.parent_alias)
            .finish()
    }
}
