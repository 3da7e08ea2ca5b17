//! Filling entities from request input.

use keel_core::{Entity, EntityId, Value};

use crate::capability::Fillable;
use crate::context::RequestContext;
use crate::field::{Field, FieldKind, ScalarType};
use crate::registry::ResourceRegistry;
use crate::relation::{RelationField, RelationKind};
use crate::rules::{as_boolean, as_number};

impl Fillable for Field {
    fn fill(&self, ctx: &RequestContext, registry: &ResourceRegistry, entity: &mut Entity) {
        if !self.is_fillable() {
            return;
        }

        match self.kind() {
            FieldKind::Scalar(scalar) => fill_scalar(self, scalar, ctx, entity),
            FieldKind::Relation(relation) => match relation.kind() {
                RelationKind::BelongsTo { foreign_key } => {
                    fill_belongs_to(self, foreign_key, ctx, entity)
                }
                RelationKind::MorphTo {
                    type_column,
                    id_column,
                    types,
                } => fill_morph_to(
                    self,
                    relation,
                    MorphColumns {
                        type_column,
                        id_column,
                        types,
                    },
                    ctx,
                    registry,
                    entity,
                ),
                // Owned by the related side, or synced after save
                RelationKind::HasOne { .. }
                | RelationKind::HasMany { .. }
                | RelationKind::MorphOne { .. }
                | RelationKind::MorphMany { .. }
                | RelationKind::BelongsToMany { .. }
                | RelationKind::MorphToMany { .. } => {}
            },
        }
    }
}

fn fill_scalar(field: &Field, scalar: &ScalarType, ctx: &RequestContext, entity: &mut Entity) {
    let key = field.key();
    if !ctx.has_input(key) {
        return;
    }
    let value = ctx.input_value(key);
    if *scalar == ScalarType::Password && value.is_blank() {
        return;
    }
    entity.set_attr(field.attribute(), cast(scalar, value, field.is_nullable()));
}

/// Cast loose request input to the field's storage shape.
///
/// Input that does not cast is kept as is; validation has already run.
pub fn cast(scalar: &ScalarType, value: &Value, nullable: bool) -> Value {
    if value.is_null() || (nullable && value.is_blank()) {
        return Value::Null;
    }
    match scalar {
        ScalarType::Number => match value {
            Value::Int(_) | Value::Float(_) => value.clone(),
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => as_number(value).map(Value::Float).unwrap_or_else(|| value.clone()),
            },
            other => as_number(other).map(Value::Float).unwrap_or_else(|| other.clone()),
        },
        ScalarType::Boolean => as_boolean(value)
            .map(Value::Bool)
            .unwrap_or_else(|| value.clone()),
        ScalarType::Text
        | ScalarType::Textarea
        | ScalarType::Email
        | ScalarType::Date
        | ScalarType::DateTime => match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other.clone(),
        },
        ScalarType::Select { .. }
        | ScalarType::File
        | ScalarType::Password
        | ScalarType::Hidden => {
            value.clone()
        }
    }
}

fn fill_belongs_to(field: &Field, foreign_key: &str, ctx: &RequestContext, entity: &mut Entity) {
    let key = field.key();
    if !ctx.has_input(key) {
        return;
    }
    let id = EntityId::from_value(ctx.input_value(key));
    entity.set_attr(foreign_key, Value::from(id));
}

struct MorphColumns<'a> {
    type_column: &'a str,
    id_column: &'a str,
    types: &'a [String],
}

/// Sets both morph columns together, or clears both.
fn fill_morph_to(
    field: &Field,
    relation: &RelationField,
    columns: MorphColumns<'_>,
    ctx: &RequestContext,
    registry: &ResourceRegistry,
    entity: &mut Entity,
) {
    let id_key = field.key();
    let type_key = field.morph_type_input_key();
    if !ctx.has_input(id_key) && !ctx.has_input(&type_key) {
        return;
    }

    let alias = ctx
        .input_value(&type_key)
        .as_str()
        .map(str::trim)
        .filter(|alias| !alias.is_empty());
    let id = EntityId::from_value(ctx.input_value(id_key));

    let target = match (alias, id) {
        (Some(alias), Some(id)) => {
            let entity_type = registry
                .resolve_morph_alias(alias)
                .filter(|entity_type| columns.types.iter().any(|t| t == entity_type));
            match entity_type {
                Some(entity_type) => Some((registry.morph_alias(entity_type).to_string(), id)),
                None => {
                    tracing::warn!(
                        relation = %relation.relation_name(),
                        alias = %alias,
                        "unknown morph alias, clearing relation"
                    );
                    None
                }
            }
        }
        _ => None,
    };

    match target {
        Some((alias, id)) => {
            entity.set_attr(columns.type_column, Value::String(alias));
            entity.set_attr(columns.id_column, Value::from(id));
        }
        None => {
            entity.set_attr(columns.type_column, Value::Null);
            entity.set_attr(columns.id_column, Value::Null);
        }
    }
}
