//! Resource definitions and the authorization gate.

use keel_core::Entity;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::FieldResult;
use crate::field::Field;

/// Groups an entity type with its fields and hooks.
///
/// Implementations are shared across requests; anything request-specific
/// comes in through the context.
pub trait Resource: Send + Sync {
    /// Entity type (storage table) this resource manages.
    fn entity_type(&self) -> &str;

    /// Fields in declaration order.
    fn fields(&self, ctx: &RequestContext) -> Vec<Field>;

    /// Runs inside the transaction before any field is filled.
    fn before_save(&self, _entity: &mut Entity, _ctx: &RequestContext) -> FieldResult<()> {
        Ok(())
    }

    /// Runs inside the transaction after relations are synced.
    fn after_save(&self, _entity: &Entity, _ctx: &RequestContext) -> FieldResult<()> {
        Ok(())
    }

    /// Label for an entity of this resource, if the resource defines one.
    fn display_label(&self, _entity: &Entity) -> Option<String> {
        None
    }

    /// Attributes searched when listing attachable entities of this resource.
    fn searchable_attributes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Actions the gate is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    View,
    Create,
    Update,
    Attach,
    Detach,
}

/// Authorization gate consulted before any transaction opens.
pub trait Gate {
    fn authorized_to(&self, ability: Ability, entity: &Entity, ctx: &RequestContext) -> bool;
}

/// Gate that allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Gate for AllowAll {
    fn authorized_to(&self, _ability: Ability, _entity: &Entity, _ctx: &RequestContext) -> bool {
        true
    }
}

/// Closures are gates.
impl<F> Gate for F
where
    F: Fn(Ability, &Entity, &RequestContext) -> bool,
{
    fn authorized_to(&self, ability: Ability, entity: &Entity, ctx: &RequestContext) -> bool {
        self(ability, entity, ctx)
    }
}
