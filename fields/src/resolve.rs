//! Field resolution for display.

use std::collections::BTreeSet;

use keel_core::{Attributes, Entity, EntityId, Value};
use keel_store::{Condition, Query, Store};
use serde::Serialize;

use crate::capability::Resolvable;
use crate::context::{RequestContext, VisibilityContext};
use crate::field::{Field, FieldKind, ScalarType};
use crate::label::resolve_label;
use crate::metadata::RelationMetadata;
use crate::registry::ResourceRegistry;
use crate::relation::{PivotTable, RelationField, RelationKind};

/// One related entity as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedItem {
    pub key: EntityId,
    pub label: String,
    /// Morph alias, for `MorphTo` targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morph_type: Option<String>,
    /// Pivot attributes, filtered to the declared pivot columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<Attributes>,
    /// Index-visible scalar values of the related resource.
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub fields: Attributes,
}

/// A bounded slice of a to-many relation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Collection {
    pub items: Vec<RelatedItem>,
    /// Size of the whole relation, not just `items`.
    pub total: usize,
}

impl Collection {
    pub fn keys(&self) -> Vec<EntityId> {
        self.items.iter().map(|item| item.key).collect()
    }
}

/// A resolved field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resolved {
    Value(Value),
    One(Option<RelatedItem>),
    Many(Collection),
}

impl Resolved {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Resolved::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_one(&self) -> Option<&RelatedItem> {
        match self {
            Resolved::One(item) => item.as_ref(),
            _ => None,
        }
    }

    pub fn as_many(&self) -> Option<&Collection> {
        match self {
            Resolved::Many(collection) => Some(collection),
            _ => None,
        }
    }

    fn empty_for(relation: &RelationField) -> Self {
        if relation.kind().is_to_one() {
            Resolved::One(None)
        } else {
            Resolved::Many(Collection::default())
        }
    }
}

impl Resolvable for Field {
    fn resolve(
        &self,
        ctx: &RequestContext,
        registry: &ResourceRegistry,
        store: &dyn Store,
        entity: &Entity,
    ) -> Resolved {
        if let Some(callback) = self.computed_callback() {
            return Resolved::Value(callback(entity));
        }

        let relation = match self.kind() {
            FieldKind::Scalar(scalar) => {
                return Resolved::Value(resolve_scalar(self, scalar, ctx, entity))
            }
            FieldKind::Relation(relation) => relation,
        };

        let Some(metadata) =
            RelationMetadata::resolve_relation(relation, &entity.entity_type, registry, store)
        else {
            return Resolved::empty_for(relation);
        };

        let reader = RelationReader {
            relation,
            metadata: &metadata,
            ctx,
            registry,
            store,
        };

        match relation.kind() {
            RelationKind::BelongsTo { foreign_key } => {
                Resolved::One(reader.belongs_to(entity, foreign_key))
            }
            RelationKind::MorphTo {
                type_column,
                id_column,
                types,
            } => Resolved::One(reader.morph_to(entity, type_column, id_column, types)),
            RelationKind::HasOne { foreign_key } => {
                let conditions = entity.id.map(|id| vec![Condition::eq(foreign_key, id)]);
                Resolved::One(reader.first_owned(conditions))
            }
            RelationKind::MorphOne {
                type_column,
                id_column,
            } => {
                let conditions = reader.morph_conditions(entity, type_column, id_column);
                Resolved::One(reader.first_owned(conditions))
            }
            RelationKind::HasMany { foreign_key } => {
                let conditions = entity.id.map(|id| vec![Condition::eq(foreign_key, id)]);
                Resolved::Many(reader.owned(conditions))
            }
            RelationKind::MorphMany {
                type_column,
                id_column,
            } => {
                let conditions = reader.morph_conditions(entity, type_column, id_column);
                Resolved::Many(reader.owned(conditions))
            }
            RelationKind::BelongsToMany { pivot } => {
                Resolved::Many(reader.pivot(entity, pivot, None))
            }
            RelationKind::MorphToMany {
                pivot,
                morph_type_column,
            } => Resolved::Many(reader.pivot(entity, pivot, Some(morph_type_column))),
        }
    }
}

/// Scalar value as displayed. Passwords never resolve.
pub(crate) fn resolve_scalar(
    field: &Field,
    scalar: &ScalarType,
    ctx: &RequestContext,
    entity: &Entity,
) -> Value {
    if *scalar == ScalarType::Password {
        return Value::Null;
    }
    let value = entity.attr_or_null(field.attribute());
    match (value.is_null(), field.default_provider()) {
        (true, Some(provider)) => provider(ctx),
        _ => value.clone(),
    }
}

struct RelationReader<'a> {
    relation: &'a RelationField,
    metadata: &'a RelationMetadata,
    ctx: &'a RequestContext,
    registry: &'a ResourceRegistry,
    store: &'a dyn Store,
}

impl<'a> RelationReader<'a> {
    fn preview_limit(&self) -> usize {
        self.registry.config().relations.preview_limit
    }

    fn load(&self, entity_type: &str, id: EntityId) -> Option<Entity> {
        match self.ctx.cache().load(self.store, entity_type, id) {
            Ok(Some(entity)) => Some(entity),
            Ok(None) => {
                tracing::warn!(
                    relation = %self.relation.relation_name(),
                    entity_type = %entity_type,
                    id = %id,
                    "related entity not found"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    relation = %self.relation.relation_name(),
                    error = %e,
                    "failed to load related entity"
                );
                None
            }
        }
    }

    fn item(
        &self,
        related: &Entity,
        morph_type: Option<String>,
        pivot: Option<Attributes>,
        with_fields: bool,
    ) -> Option<RelatedItem> {
        let key = related.id?;
        let resource = self.registry.resource(&related.entity_type);
        let label = resolve_label(
            self.relation,
            resource.map(|r| &**r),
            related,
            &self.registry.config().labels,
        );
        let fields = if with_fields {
            self.index_values(related)
        } else {
            Attributes::new()
        };
        Some(RelatedItem {
            key,
            label,
            morph_type,
            pivot,
            fields,
        })
    }

    /// Index-visible scalar values of the related entity's resource.
    fn index_values(&self, related: &Entity) -> Attributes {
        let fields = match self.registry.field_set(self.ctx, &related.entity_type) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::debug!(error = %e, "no index fields for related entity");
                return Attributes::new();
            }
        };
        fields
            .visible_for(VisibilityContext::Index)
            .filter_map(|field| match field.kind() {
                FieldKind::Scalar(scalar) => {
                    let value = match field.computed_callback() {
                        Some(callback) => callback(related),
                        None => resolve_scalar(field, scalar, self.ctx, related),
                    };
                    Some((field.key().to_string(), value))
                }
                FieldKind::Relation(_) => None,
            })
            .collect()
    }

    fn belongs_to(&self, entity: &Entity, foreign_key: &str) -> Option<RelatedItem> {
        let id = EntityId::from_value(entity.attr_or_null(foreign_key))?;
        let related = self.load(&self.metadata.related_type, id)?;
        self.item(&related, None, None, false)
    }

    fn morph_to(
        &self,
        entity: &Entity,
        type_column: &str,
        id_column: &str,
        types: &[String],
    ) -> Option<RelatedItem> {
        let alias = entity.attr_or_null(type_column).as_str()?;
        let id = EntityId::from_value(entity.attr_or_null(id_column))?;
        let Some(entity_type) = self
            .registry
            .resolve_morph_alias(alias)
            .filter(|entity_type| types.iter().any(|t| t == entity_type))
        else {
            tracing::warn!(
                relation = %self.relation.relation_name(),
                alias = %alias,
                "unknown morph alias"
            );
            return None;
        };
        let related = self.load(entity_type, id)?;
        let morph_type = self.registry.morph_alias(entity_type).to_string();
        self.item(&related, Some(morph_type), None, false)
    }

    fn morph_conditions(
        &self,
        entity: &Entity,
        type_column: &str,
        id_column: &str,
    ) -> Option<Vec<Condition>> {
        entity.id.map(|id| {
            vec![
                Condition::eq(type_column, self.metadata.parent_alias.as_str()),
                Condition::eq(id_column, id),
            ]
        })
    }

    fn query(&self, conditions: Vec<Condition>) -> Query {
        conditions
            .into_iter()
            .fold(Query::new(&self.metadata.related_type), Query::filter)
    }

    fn first_owned(&self, conditions: Option<Vec<Condition>>) -> Option<RelatedItem> {
        let query = self.query(conditions?).limit(1);
        match self.store.select(&query) {
            Ok(rows) => rows
                .first()
                .and_then(|related| self.item(related, None, None, true)),
            Err(e) => {
                tracing::warn!(
                    relation = %self.relation.relation_name(),
                    error = %e,
                    "relation query failed"
                );
                None
            }
        }
    }

    fn owned(&self, conditions: Option<Vec<Condition>>) -> Collection {
        let Some(conditions) = conditions else {
            return Collection::default();
        };
        let query = self.query(conditions);
        let preview = query.clone().limit(self.preview_limit());
        let result = self
            .store
            .count(&query)
            .and_then(|total| Ok((total, self.store.select(&preview)?)));
        match result {
            Ok((total, rows)) => Collection {
                items: rows
                    .iter()
                    .filter_map(|related| self.item(related, None, None, true))
                    .collect(),
                total,
            },
            Err(e) => {
                tracing::warn!(
                    relation = %self.relation.relation_name(),
                    error = %e,
                    "relation query failed"
                );
                Collection::default()
            }
        }
    }

    fn pivot(
        &self,
        entity: &Entity,
        pivot: &PivotTable,
        morph_type_column: Option<&String>,
    ) -> Collection {
        let Some(parent_id) = entity.id else {
            return Collection::default();
        };
        let mut conditions = vec![Condition::eq(&pivot.parent_key, parent_id)];
        if let Some(column) = morph_type_column {
            conditions.push(Condition::eq(column, self.metadata.parent_alias.as_str()));
        }

        let rows = match self.store.pivot_select(&pivot.table, &conditions) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    relation = %self.relation.relation_name(),
                    error = %e,
                    "pivot query failed"
                );
                return Collection::default();
            }
        };

        // One item per related record; rows pointing at missing records are skipped.
        let mut seen = BTreeSet::new();
        let linked: Vec<(Entity, &Attributes)> = rows
            .iter()
            .filter_map(|row| {
                let id = EntityId::from_value(row.get(&pivot.related_key)?)?;
                if !seen.insert(id) {
                    return None;
                }
                let related = self.load(&self.metadata.related_type, id)?;
                Some((related, row))
            })
            .collect();

        let items = linked
            .iter()
            .take(self.preview_limit())
            .filter_map(|(related, row)| {
                let values = filter_pivot(row, &pivot.columns);
                self.item(related, None, Some(values), false)
            })
            .collect();

        Collection {
            items,
            total: linked.len(),
        }
    }
}

/// Keep only declared pivot columns.
pub fn filter_pivot(row: &Attributes, columns: &[String]) -> Attributes {
    row.iter()
        .filter(|(column, _)| columns.contains(column))
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect()
}
